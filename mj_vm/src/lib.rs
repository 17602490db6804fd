//! Stack-machine interpreter and garbage collector (spec.md §4.3): executes
//! a compiled [`mj_bytecode::Program`].

mod error;
mod frame;
mod gc;
mod heap;
mod interp;
mod value;

pub use error::RuntimeError;
pub use frame::Frame;
pub use heap::Heap;
pub use interp::{run, Vm};
pub use value::Value;

#[cfg(test)]
mod tests {
    use super::*;

    fn compile(src: &str) -> mj_bytecode::Program {
        let program = mj_parser::parse(src).expect("parses");
        let symtbl = mj_semant::build_symbol_table(&program).expect("resolves");
        let types = mj_semant::type_check(&symtbl, &program).expect("type-checks");
        mj_compile::compile(&program, &types).expect("compiles")
    }

    fn run_and_capture(src: &str) -> String {
        let bc = compile(src);
        let mut out = Vec::new();
        run(&bc, &mut out).expect("runs");
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn prints_a_literal() {
        assert_eq!(
            run_and_capture("class Main { public static void main(String[] a){ System.out.println(42); } }"),
            "42\n"
        );
    }

    #[test]
    fn arithmetic_precedence() {
        let src = "class Main { public static void main(String[] a){ System.out.println(2 + 3 * 4); } }";
        assert_eq!(run_and_capture(src), "14\n");
    }

    #[test]
    fn while_loop_sums_one_to_ten() {
        let src = "
            class Main { public static void main(String[] a){ System.out.println(new Sum().compute()); } }
            class Sum {
                public int compute() {
                    int i; int s;
                    i = 1; s = 0;
                    while (i < 11) { s = s + i; i = i + 1; }
                    return s;
                }
            }
        ";
        assert_eq!(run_and_capture(src), "55\n");
    }

    #[test]
    fn array_store_and_load_round_trip_negative_values() {
        let src = "
            class Main { public static void main(String[] a){ System.out.println(new Holder().run()); } }
            class Holder {
                public int run() {
                    int[] xs;
                    xs = new int[3];
                    xs[0] = 0 - 7;
                    return xs[0];
                }
            }
        ";
        assert_eq!(run_and_capture(src), "-7\n");
    }

    #[test]
    fn virtual_dispatch_calls_the_overriding_method() {
        // `x`'s declared type is `A`; assigning it a `B` relies on subtype
        // compatibility for assignment (Open Question 3, SPEC_FULL.md). At
        // the call site the vtable slot is resolved against the *runtime*
        // class of the receiver, so the override wins.
        let src = "
            class Main { public static void main(String[] a){ System.out.println(new Holder().run()); } }
            class A { public int f() { return 1; } }
            class B extends A { public int f() { return 2; } }
            class Holder {
                public int run() {
                    A x;
                    x = new B();
                    return x.f();
                }
            }
        ";
        assert_eq!(run_and_capture(src), "2\n");
    }

    #[test]
    fn inherited_field_is_visible_through_a_subclass_method() {
        let src = "
            class Main { public static void main(String[] a){ System.out.println(new C().run()); } }
            class P { int x; }
            class C extends P {
                public int run() {
                    x = 9;
                    return x;
                }
            }
        ";
        assert_eq!(run_and_capture(src), "9\n");
    }

    #[test]
    fn garbage_collection_reclaims_unreachable_instances_under_pressure() {
        // Field access only reaches the current object's own fields (bare
        // identifier resolution, no `obj.field` syntax), so exercising a
        // field write on each churned `Node` goes through a method on
        // `Node` itself rather than the caller poking the field directly.
        let src = "
            class Main { public static void main(String[] a){ System.out.println(new Churner().run()); } }
            class Node { int v; public int touch(int x) { v = x; return v; } }
            class Churner {
                public int run() {
                    int i; int total;
                    i = 0; total = 0;
                    while (i < 1000) {
                        total = total + new Node().touch(i);
                        i = i + 1;
                    }
                    return total;
                }
            }
        ";
        // Each Node is 24 bytes (16-byte header + one field); a budget of a
        // few hundred bytes forces `ensure_capacity` to invoke the collector
        // well before 1000 short-lived instances would fit unreclaimed.
        let bc = compile(src);
        let mut out = Vec::new();
        let heap = Heap::with_max_bytes(512);
        let mut vm = Vm::with_heap(&bc, &mut out, heap).expect("builds");
        vm.run().expect("runs without exhausting the heap");
        assert_eq!(String::from_utf8(out).unwrap(), "499500\n");
    }

    #[test]
    fn if_else_runs_exactly_one_arm() {
        // Regression test for the basic-block linearization bug where a
        // traversal order (rather than creation order) placed the join
        // block ahead of the else arm, so the else arm's code ran as a
        // fall-through after the then arm instead of being skipped.
        let src = "
            class Main { public static void main(String[] a){ System.out.println(new C().f()); } }
            class C {
                public int f() {
                    if (1 < 2) { System.out.println(100); } else { System.out.println(200); }
                    return 0;
                }
            }
        ";
        assert_eq!(run_and_capture(src), "100\n0\n");

        let src_else = "
            class Main { public static void main(String[] a){ System.out.println(new C().f()); } }
            class C {
                public int f() {
                    if (2 < 1) { System.out.println(100); } else { System.out.println(200); }
                    return 0;
                }
            }
        ";
        assert_eq!(run_and_capture(src_else), "200\n0\n");
    }
}

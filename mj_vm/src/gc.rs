//! Mark-and-sweep collection (spec.md §4.3 "Garbage collector"). Roots are
//! every value live in any frame's operand stack or locals; frames
//! themselves are never collected.

use crate::frame::Frame;
use crate::heap::ObjectKind;
use crate::value::Value;
use crate::Heap;

/// Marks everything reachable from every frame, then sweeps. Already-marked
/// objects short-circuit the recursion — without this a reference cycle
/// between two instances would recurse forever (spec.md §9 open question).
pub fn collect(heap: &mut Heap, frames: &[Frame]) -> usize {
    for frame in frames {
        for value in frame.operand_stack.iter().chain(frame.locals.iter()) {
            mark(heap, *value);
        }
    }
    heap.sweep()
}

fn mark(heap: &mut Heap, value: Value) {
    if value.is_int() {
        return;
    }
    let index = match value.as_ptr() {
        Ok(i) => i,
        Err(_) => return,
    };
    mark_index(heap, index);
}

fn mark_index(heap: &mut Heap, index: usize) {
    let already_marked = heap.get(index).marked;
    if already_marked {
        return;
    }
    heap.get_mut(index).marked = true;

    let field_words: Vec<i64> = match &heap.get(index).kind {
        ObjectKind::Array { .. } => return, // its buffer holds only integers
        ObjectKind::Instance { fields, .. } => fields.clone(),
    };
    for word in field_words {
        let field_value = Value::from_raw(word);
        if !field_value.is_int() {
            if let Ok(child) = field_value.as_ptr() {
                mark_index(heap, child);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::heap::Heap;

    #[test]
    fn already_marked_objects_short_circuit_so_cycles_terminate() {
        let mut heap = Heap::new();
        let a = heap.alloc_object(0, 1);
        let b = heap.alloc_object(0, 1);
        heap.putfield(a.as_ptr().unwrap(), 0, b);
        heap.putfield(b.as_ptr().unwrap(), 0, a); // cycle: a.f0 = b, b.f0 = a

        let frame = Frame::new(0, vec![a]);
        // Would hang without the already-marked short-circuit.
        let reclaimed = collect(&mut heap, std::slice::from_ref(&frame));
        assert_eq!(reclaimed, 0);
    }

    #[test]
    fn unreachable_objects_are_swept() {
        let mut heap = Heap::new();
        let _garbage = heap.alloc_object(0, 0);
        let frame = Frame::new(0, vec![]);
        let reclaimed = collect(&mut heap, std::slice::from_ref(&frame));
        assert_eq!(reclaimed, 1);
    }
}

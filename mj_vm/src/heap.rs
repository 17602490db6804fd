//! Heap objects and the allocator/accounting half of the garbage collector
//! (spec.md §4.3 "Heap objects", "Garbage collector"). Mark/sweep proper
//! lives in [`crate::gc`], since it needs to see the frame stack too.

use crate::value::Value;

const HEADER_BYTES: usize = 16; // metadata pointer + size word
const WORD_BYTES: usize = 8;
const DEFAULT_MAX_BYTES: usize = 128 * 1024 * 1024;

#[derive(Debug, Clone)]
pub enum ObjectKind {
    /// `class_index` names the allocated class's slot in the program's
    /// class table; `fields` holds one tagged word per field, inherited
    /// fields first (mirrors `ClassLayout::fields`).
    Instance { class_index: usize, fields: Vec<i64> },
    /// Raw untagged integer words (spec.md §4.3's separate element buffer).
    Array { buffer: Vec<i64> },
}

#[derive(Debug, Clone)]
pub struct HeapObject {
    pub kind: ObjectKind,
    pub marked: bool,
}

impl HeapObject {
    fn byte_size(&self) -> usize {
        match &self.kind {
            ObjectKind::Instance { fields, .. } => HEADER_BYTES + fields.len() * WORD_BYTES,
            ObjectKind::Array { buffer } => HEADER_BYTES + buffer.len() * WORD_BYTES,
        }
    }
}

/// The allocation arena. Slots are reused via a free list once swept, the
/// same way a real allocator would reuse address space.
#[derive(Debug)]
pub struct Heap {
    objects: Vec<Option<HeapObject>>,
    free: Vec<usize>,
    current_bytes: usize,
    max_bytes: usize,
}

impl Default for Heap {
    fn default() -> Self {
        Heap {
            objects: Vec::new(),
            free: Vec::new(),
            current_bytes: 0,
            max_bytes: DEFAULT_MAX_BYTES,
        }
    }
}

impl Heap {
    pub fn new() -> Self {
        Heap::default()
    }

    /// A heap with a caller-chosen byte budget instead of the default 128
    /// MiB, so a test can force `ensure_capacity`'s GC trigger to fire
    /// without allocating hundreds of megabytes of garbage first.
    pub fn with_max_bytes(max_bytes: usize) -> Self {
        Heap { max_bytes, ..Heap::default() }
    }

    pub fn current_bytes(&self) -> usize {
        self.current_bytes
    }

    pub fn max_bytes(&self) -> usize {
        self.max_bytes
    }

    pub fn get(&self, index: usize) -> &HeapObject {
        self.objects[index]
            .as_ref()
            .expect("live heap pointer referenced a swept slot")
    }

    pub fn get_mut(&mut self, index: usize) -> &mut HeapObject {
        self.objects[index]
            .as_mut()
            .expect("live heap pointer referenced a swept slot")
    }

    pub fn would_exceed(&self, request_bytes: usize) -> bool {
        self.current_bytes + request_bytes > self.max_bytes
    }

    fn insert(&mut self, object: HeapObject) -> usize {
        self.current_bytes += object.byte_size();
        match self.free.pop() {
            Some(slot) => {
                self.objects[slot] = Some(object);
                slot
            }
            None => {
                self.objects.push(Some(object));
                self.objects.len() - 1
            }
        }
    }

    pub fn object_bytes(num_fields: usize) -> usize {
        HEADER_BYTES + num_fields * WORD_BYTES
    }

    pub fn array_bytes(len: usize) -> usize {
        HEADER_BYTES + len * WORD_BYTES
    }

    pub fn alloc_object(&mut self, class_index: usize, num_fields: usize) -> Value {
        let index = self.insert(HeapObject {
            kind: ObjectKind::Instance {
                class_index,
                fields: vec![0; num_fields],
            },
            marked: false,
        });
        Value::ptr(index)
    }

    pub fn alloc_array(&mut self, len: usize) -> Value {
        let index = self.insert(HeapObject {
            kind: ObjectKind::Array { buffer: vec![0; len] },
            marked: false,
        });
        Value::ptr(index)
    }

    /// Sweep phase: reclaim every unmarked slot, clear the mark on survivors.
    /// Returns the number of objects reclaimed (for diagnostics/tests).
    pub fn sweep(&mut self) -> usize {
        let mut reclaimed = 0;
        for (index, slot) in self.objects.iter_mut().enumerate() {
            let Some(object) = slot else { continue };
            if object.marked {
                object.marked = false;
            } else {
                self.current_bytes -= object.byte_size();
                *slot = None;
                self.free.push(index);
                reclaimed += 1;
            }
        }
        reclaimed
    }

    pub fn getfield(&self, index: usize, field: usize) -> Value {
        match &self.get(index).kind {
            ObjectKind::Instance { fields, .. } => Value::from_raw(fields[field]),
            ObjectKind::Array { .. } => unreachable!("getfield on an array object"),
        }
    }

    pub fn putfield(&mut self, index: usize, field: usize, value: Value) {
        match &mut self.get_mut(index).kind {
            ObjectKind::Instance { fields, .. } => fields[field] = value.raw(),
            ObjectKind::Array { .. } => unreachable!("putfield on an array object"),
        }
    }

    pub fn iaload(&self, index: usize, element: usize) -> Value {
        match &self.get(index).kind {
            ObjectKind::Array { buffer } => Value::from_raw(buffer[element] | 1),
            ObjectKind::Instance { .. } => unreachable!("iaload on a non-array object"),
        }
    }

    pub fn iastore(&mut self, index: usize, element: usize, value: Value) {
        match &mut self.get_mut(index).kind {
            ObjectKind::Array { buffer } => buffer[element] = value.untagged_word(),
            ObjectKind::Instance { .. } => unreachable!("iastore on a non-array object"),
        }
    }

    pub fn class_index_of(&self, index: usize) -> usize {
        match &self.get(index).kind {
            ObjectKind::Instance { class_index, .. } => *class_index,
            ObjectKind::Array { .. } => unreachable!("class_index_of an array object"),
        }
    }
}

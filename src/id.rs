use crate::protocol::RequestId;

/// Issues request ids. Ids returned with `recycle` are handed out again, most recently
/// recycled first, before the counter is advanced.
///
/// The generator knows nothing about which ids are in flight. Its owner must only recycle
/// ids whose requests are finished and must skip generated ids that are still in use.
pub struct IdGenerator {
    next_id: i64,
    recycled: Vec<i64>,
}

impl IdGenerator {
    pub(crate) fn new() -> IdGenerator {
        IdGenerator {
            next_id: 0,
            recycled: Vec::new(),
        }
    }

    pub(crate) fn generate(&mut self) -> RequestId {
        match self.recycled.pop() {
            Some(id) => RequestId::Int(id),
            None => {
                let id = self.next_id;
                self.next_id += 1;
                RequestId::Int(id)
            }
        }
    }

    /// Return `id` to the pool. String ids, ids never issued by this generator and ids
    /// already in the pool are ignored.
    pub(crate) fn recycle(&mut self, id: &RequestId) {
        let id = match id {
            RequestId::Int(id) => *id,
            RequestId::Str(_) => return,
        };

        if id < 0 || id >= self.next_id || self.recycled.contains(&id) {
            return;
        }

        self.recycled.push(id);
    }
}

use foundation::ids::ObjectId;

/// The single currently selected object, if any.
///
/// Selection holds an id, not the object: the object itself stays owned by
/// the position cache and is looked up on readout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    current: Option<ObjectId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self) -> Option<ObjectId> {
        self.current
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_none()
    }

    /// Replaces the selection with a pick result; `None` clears it.
    ///
    /// Returns `true` if the selection changed.
    pub fn apply_pick(&mut self, picked: Option<ObjectId>) -> bool {
        let changed = self.current != picked;
        self.current = picked;
        changed
    }

    pub fn select(&mut self, id: ObjectId) -> bool {
        self.apply_pick(Some(id))
    }

    /// Returns `true` if something was selected.
    pub fn clear(&mut self) -> bool {
        self.current.take().is_some()
    }

    /// Clears the selection if `id` is the selected object.
    pub fn forget(&mut self, id: ObjectId) -> bool {
        if self.current == Some(id) {
            self.current = None;
            return true;
        }
        false
    }
}

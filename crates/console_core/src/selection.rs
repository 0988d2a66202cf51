use std::collections::HashSet;

/// Identifiers marked for a bulk action. Always a subset of the currently
/// visible rows: `select_all` takes the visible id list rather than the full
/// store, and `retain_visible` prunes after a structural change to the view.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectionSet {
    ids: HashSet<String>,
}

impl SelectionSet {
    pub fn select_all<I, S>(&mut self, visible_ids: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.ids = visible_ids.into_iter().map(Into::into).collect();
    }

    pub fn toggle(&mut self, id: impl Into<String>, on: bool) {
        let id = id.into();
        if on {
            self.ids.insert(id);
        } else {
            self.ids.remove(&id);
        }
    }

    pub fn deselect(&mut self, id: &str) {
        self.ids.remove(id);
    }

    pub fn clear(&mut self) {
        self.ids.clear();
    }

    pub fn retain_visible<'a, I>(&mut self, visible_ids: I)
    where
        I: IntoIterator<Item = &'a str>,
    {
        let visible: HashSet<&str> = visible_ids.into_iter().collect();
        self.ids.retain(|id| visible.contains(id.as_str()));
    }

    pub fn contains(&self, id: &str) -> bool {
        self.ids.contains(id)
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.ids.iter().map(String::as_str)
    }
}

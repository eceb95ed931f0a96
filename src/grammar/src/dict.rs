use ahash::AHashMap;

/// An ordered name catalogue. The position of a name within the catalogue is
/// its dense identifier, used to index every per-type table of the grammar.
#[derive(Debug, Default, Clone)]
pub struct Dictionary {
    names: Vec<String>,
    index: AHashMap<String, usize>,
}

impl Dictionary {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `name` and return its id. Returns `None` when the name is
    /// already present (the caller decides whether that is an error).
    pub fn insert(&mut self, name: &str) -> Option<usize> {
        if self.index.contains_key(name) {
            return None;
        }
        let id = self.names.len();
        self.names.push(name.to_string());
        self.index.insert(name.to_string(), id);
        Some(id)
    }

    /// Register `name`, or return the id it already has.
    pub fn insert_or_get(&mut self, name: &str) -> usize {
        match self.index.get(name) {
            Some(&id) => id,
            None => self.insert(name).expect("checked for absence"),
        }
    }

    #[must_use]
    pub fn id(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    #[must_use]
    pub fn name(&self, id: usize) -> &str {
        &self.names[id]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.names.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_dense_and_ordered() {
        let mut dict = Dictionary::new();
        assert_eq!(dict.insert("BEGIN"), Some(0));
        assert_eq!(dict.insert("exon"), Some(1));
        assert_eq!(dict.insert("END"), Some(2));
        assert_eq!(dict.len(), 3);
        assert_eq!(dict.id("exon"), Some(1));
        assert_eq!(dict.name(2), "END");
    }

    #[test]
    fn duplicate_insert_is_rejected() {
        let mut dict = Dictionary::new();
        dict.insert("exon");
        assert_eq!(dict.insert("exon"), None);
        assert_eq!(dict.insert_or_get("exon"), 0);
    }
}

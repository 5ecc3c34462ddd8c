use crate::entry::Entry;
use crate::error::StoreError;
use zeroize::Zeroizing;

/// Ordered collection of entries, unique by name.
///
/// Insertion order is kept so the serialized form is stable across writes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct EntryCollection {
    entries: Vec<Entry>,
}

impl EntryCollection {
    pub fn new() -> Self {
        EntryCollection {
            entries: Vec::new(),
        }
    }

    pub fn add(&mut self, entry: Entry) -> Result<(), StoreError> {
        if self.position(entry.name()).is_some() {
            Err(StoreError::DuplicateName(entry.name().to_string()))
        } else {
            self.entries.push(entry);
            Ok(())
        }
    }

    pub fn find(&self, name: &str) -> Result<&Entry, StoreError> {
        self.position(name)
            .map(|i| &self.entries[i])
            .ok_or_else(|| StoreError::NotFound(name.to_string()))
    }

    pub fn remove(&mut self, name: &str) -> Result<Entry, StoreError> {
        match self.position(name) {
            Some(i) => Ok(self.entries.remove(i)),
            None => Err(StoreError::NotFound(name.to_string())),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.name())
    }

    pub fn iter(&self) -> impl Iterator<Item = &Entry> {
        self.entries.iter()
    }

    pub fn count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn serialized_size(&self) -> usize {
        self.entries.iter().map(Entry::serial_size).sum()
    }

    /// Concatenated record encodings, in insertion order.
    pub fn serialize_all(&self) -> Zeroizing<Vec<u8>> {
        let mut buf = Zeroizing::new(Vec::with_capacity(self.serialized_size()));
        for entry in &self.entries {
            entry.encode_into(&mut buf);
        }
        buf
    }

    pub fn deserialize_all(mut data: &[u8]) -> Result<Self, StoreError> {
        let mut collection = Self::new();
        while !data.is_empty() {
            let entry = Entry::decode_from(&mut data).map_err(|_| StoreError::Malformed)?;
            collection
                .add(entry)
                .map_err(|_| StoreError::Malformed)?;
        }
        Ok(collection)
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|e| e.name() == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: [u8; 32] = [7u8; 32];

    fn entry(name: &str, secret: &str) -> Entry {
        Entry::create(name, secret.as_bytes(), &KEY).unwrap()
    }

    #[test]
    fn create_new_collection_works() {
        let store = EntryCollection::new();
        assert_eq!(store.count(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn add_and_find_works() {
        let mut store = EntryCollection::new();
        store.add(entry("A", "B")).unwrap();

        let found = store.find("A").unwrap();
        assert_eq!(&**found.reveal(&KEY).unwrap(), b"B");
    }

    #[test]
    fn add_existing_name_fails() {
        let mut store = EntryCollection::new();
        store.add(entry("A", "B")).unwrap();
        match store.add(entry("A", "C")) {
            Err(StoreError::DuplicateName(k)) => assert_eq!(k, "A"),
            other => panic!("expected DuplicateName, got: {other:?}"),
        }
        assert_eq!(store.count(), 1);
    }

    #[test]
    fn remove_works() {
        let mut store = EntryCollection::new();
        store.add(entry("A", "B")).unwrap();
        let removed = store.remove("A").unwrap();

        assert_eq!(removed.name(), "A");
        assert!(!store.contains("A"));
    }

    #[test]
    fn remove_not_existing_fails() {
        let mut store = EntryCollection::new();
        match store.remove("A") {
            Err(StoreError::NotFound(k)) => assert_eq!(k, "A"),
            other => panic!("expected NotFound, got: {other:?}"),
        }
    }

    #[test]
    fn find_not_existing_fails() {
        let store = EntryCollection::new();
        assert!(matches!(store.find("A"), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn serialization_keeps_insertion_order() {
        let mut store = EntryCollection::new();
        for name in ["zeta", "alpha", "mid"] {
            store.add(entry(name, "pw")).unwrap();
        }

        let bytes = store.serialize_all();
        assert_eq!(bytes.len(), store.serialized_size());

        let restored = EntryCollection::deserialize_all(&bytes).unwrap();
        assert_eq!(restored, store);
        assert_eq!(
            restored.names().collect::<Vec<_>>(),
            vec!["zeta", "alpha", "mid"]
        );
    }

    #[test]
    fn empty_collection_serializes_to_nothing() {
        let store = EntryCollection::new();
        assert!(store.serialize_all().is_empty());
        assert!(EntryCollection::deserialize_all(&[]).unwrap().is_empty());
    }

    #[test]
    fn truncated_collection_is_malformed() {
        let mut store = EntryCollection::new();
        store.add(entry("A", "B")).unwrap();
        let bytes = store.serialize_all();

        assert!(matches!(
            EntryCollection::deserialize_all(&bytes[..bytes.len() - 1]),
            Err(StoreError::Malformed)
        ));
    }

    #[test]
    fn duplicate_names_are_malformed() {
        let mut bytes = entry("A", "B").encode();
        bytes.extend_from_slice(&entry("A", "C").encode());

        assert!(matches!(
            EntryCollection::deserialize_all(&bytes),
            Err(StoreError::Malformed)
        ));
    }
}

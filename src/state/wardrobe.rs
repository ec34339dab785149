/// The wardrobe catalog
///
/// Garments the user can pick from: a fixed seed plus anything they have
/// successfully worn. The catalog only ever grows; identity is the
/// garment id.

use crate::images::ImageHandle;

/// One selectable garment.
#[derive(Debug, Clone, PartialEq)]
pub struct Garment {
    /// Unique id; two descriptors with the same id are the same garment.
    pub id: String,
    /// Display name (file name for uploads).
    pub name: String,
    /// The flat product shot sent to the provider.
    pub image: ImageHandle,
}

/// All garments known to this session, in insertion order.
#[derive(Debug, Default)]
pub struct Wardrobe {
    items: Vec<Garment>,
}

impl Wardrobe {
    /// Build a wardrobe from the seed set, deduplicating by id.
    pub fn new(seed: Vec<Garment>) -> Self {
        let mut wardrobe = Self { items: Vec::new() };
        for garment in seed {
            wardrobe.add(garment);
        }
        wardrobe
    }

    /// Add a garment unless one with the same id is already present.
    /// Returns whether the catalog grew.
    pub fn add(&mut self, garment: Garment) -> bool {
        if self.items.iter().any(|item| item.id == garment.id) {
            return false;
        }
        self.items.push(garment);
        true
    }

    pub fn get(&self, id: &str) -> Option<&Garment> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Garment> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::images::tests::test_handle;

    fn garment(id: &str) -> Garment {
        Garment {
            id: id.to_string(),
            name: format!("Garment {id}"),
            image: test_handle(1),
        }
    }

    #[test]
    fn add_deduplicates_by_id() {
        let mut wardrobe = Wardrobe::new(vec![garment("g1")]);
        assert!(!wardrobe.add(garment("g1")));
        assert!(wardrobe.add(garment("g2")));
        assert_eq!(wardrobe.len(), 2);
    }

    #[test]
    fn seed_is_deduplicated_too() {
        let wardrobe = Wardrobe::new(vec![garment("g1"), garment("g1")]);
        assert_eq!(wardrobe.len(), 1);
    }
}

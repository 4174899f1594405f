//! Declared class ancestry and its C3 linearization.

use std::collections::{HashMap, VecDeque};

use crate::error::{TypeMapError, TypeMapResult};

/// Class → direct parents, in declaration order.
///
/// Classes never declared have no parents.
#[derive(Clone, Debug, Default)]
pub struct Hierarchy {
    parents: HashMap<String, Vec<String>>,
}

impl Hierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style [`declare`](Self::declare).
    pub fn with<I, P>(mut self, class: impl Into<String>, parents: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.declare(class, parents);
        self
    }

    /// Declare (or redeclare) the direct parents of `class`.
    pub fn declare<I, P>(&mut self, class: impl Into<String>, parents: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<String>,
    {
        self.parents
            .insert(class.into(), parents.into_iter().map(Into::into).collect());
    }

    /// Direct parents of `class`.
    pub fn parents(&self, class: &str) -> &[String] {
        self.parents.get(class).map(Vec::as_slice).unwrap_or(&[])
    }

    /// The C3 linearization of `class`: the class itself, then every
    /// ancestor, each subclass before all of its superclasses and parents
    /// in declaration order.
    pub fn linearize(&self, class: &str) -> TypeMapResult<Vec<String>> {
        let mut visiting = Vec::new();
        self.linearize_inner(class, &mut visiting)
    }

    /// Returns `true` if `ancestor` is `class` or one of its ancestors.
    pub fn is_a(&self, class: &str, ancestor: &str) -> TypeMapResult<bool> {
        Ok(self.linearize(class)?.iter().any(|c| c == ancestor))
    }

    fn linearize_inner(&self, class: &str, visiting: &mut Vec<String>) -> TypeMapResult<Vec<String>> {
        if visiting.iter().any(|c| c == class) {
            return Err(TypeMapError::CyclicHierarchy(class.to_string()));
        }
        let parents = self.parents(class);
        if parents.is_empty() {
            return Ok(vec![class.to_string()]);
        }

        visiting.push(class.to_string());
        let mut sequences = Vec::with_capacity(parents.len() + 1);
        for parent in parents {
            sequences.push(VecDeque::from(self.linearize_inner(parent, visiting)?));
        }
        sequences.push(parents.iter().cloned().collect::<VecDeque<_>>());
        visiting.pop();

        let mut result = vec![class.to_string()];
        loop {
            sequences.retain(|seq| !seq.is_empty());
            if sequences.is_empty() {
                return Ok(result);
            }
            // A head is eligible when it appears in no sequence's tail.
            let head = sequences
                .iter()
                .filter_map(|seq| seq.front())
                .find(|candidate| {
                    !sequences
                        .iter()
                        .any(|seq| seq.iter().skip(1).any(|c| c == *candidate))
                })
                .cloned()
                .ok_or_else(|| TypeMapError::InconsistentHierarchy(class.to_string()))?;

            for seq in &mut sequences {
                if seq.front() == Some(&head) {
                    seq.pop_front();
                }
            }
            result.push(head);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shapes() -> Hierarchy {
        Hierarchy::new()
            .with("Circle", ["Shape"])
            .with("Square", ["Shape"])
            .with("Shape", ["Drawable"])
    }

    #[test]
    fn undeclared_class_is_its_own_linearization() {
        assert_eq!(Hierarchy::new().linearize("Point").unwrap(), vec!["Point"]);
    }

    #[test]
    fn single_inheritance_chain() {
        assert_eq!(
            shapes().linearize("Circle").unwrap(),
            vec!["Circle", "Shape", "Drawable"]
        );
        assert!(shapes().is_a("Square", "Drawable").unwrap());
        assert!(!shapes().is_a("Shape", "Circle").unwrap());
    }

    #[test]
    fn diamond_puts_subclasses_first() {
        let hierarchy = Hierarchy::new()
            .with("B", ["A"])
            .with("C", ["A"])
            .with("D", ["B", "C"]);
        assert_eq!(hierarchy.linearize("D").unwrap(), vec!["D", "B", "C", "A"]);
    }

    #[test]
    fn classic_c3_example() {
        // O; A, B, C, D, E extend O; K1(A, B, C); K2(D, B, E); K3(D, A); Z(K1, K2, K3)
        let hierarchy = Hierarchy::new()
            .with("A", ["O"])
            .with("B", ["O"])
            .with("C", ["O"])
            .with("D", ["O"])
            .with("E", ["O"])
            .with("K1", ["A", "B", "C"])
            .with("K2", ["D", "B", "E"])
            .with("K3", ["D", "A"])
            .with("Z", ["K1", "K2", "K3"]);
        assert_eq!(
            hierarchy.linearize("Z").unwrap(),
            vec!["Z", "K1", "K2", "K3", "D", "A", "B", "C", "E", "O"]
        );
    }

    #[test]
    fn inconsistent_order_is_rejected() {
        let hierarchy = Hierarchy::new()
            .with("X", ["O"])
            .with("Y", ["O"])
            .with("A", ["X", "Y"])
            .with("B", ["Y", "X"])
            .with("Z", ["A", "B"]);
        assert_eq!(
            hierarchy.linearize("Z").unwrap_err(),
            TypeMapError::InconsistentHierarchy("Z".into())
        );
    }

    #[test]
    fn cycles_are_rejected() {
        let hierarchy = Hierarchy::new().with("A", ["B"]).with("B", ["A"]);
        assert!(matches!(
            hierarchy.linearize("A").unwrap_err(),
            TypeMapError::CyclicHierarchy(_)
        ));
    }

    #[test]
    fn redeclare_replaces_parents() {
        let mut hierarchy = shapes();
        hierarchy.declare("Circle", Vec::<String>::new());
        assert!(hierarchy.parents("Circle").is_empty());
        assert_eq!(hierarchy.parents("Square"), ["Shape".to_string()]);
    }
}

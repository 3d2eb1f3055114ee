use serde::Deserialize;

/// A value that may appear as a single item or a list in the upstream
/// XML/JSON payloads (§9 design note: "dynamic shapes in upstream JSON").
/// Every call site normalises through `into_vec()` rather than branching
/// on shape itself.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
    #[serde(skip)]
    None,
}

impl<T> Default for OneOrMany<T> {
    fn default() -> Self {
        OneOrMany::None
    }
}

impl<T> OneOrMany<T> {
    pub fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
            OneOrMany::None => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_value_normalises_to_one_element() {
        let v: OneOrMany<u32> = OneOrMany::One(5);
        assert_eq!(v.into_vec(), vec![5]);
    }

    #[test]
    fn many_values_pass_through() {
        let v: OneOrMany<u32> = OneOrMany::Many(vec![1, 2, 3]);
        assert_eq!(v.into_vec(), vec![1, 2, 3]);
    }

    #[test]
    fn missing_value_normalises_to_empty() {
        let v: OneOrMany<u32> = OneOrMany::None;
        assert_eq!(v.into_vec(), Vec::<u32>::new());
    }
}

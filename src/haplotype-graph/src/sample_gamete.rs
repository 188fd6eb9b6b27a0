use std::{
    fmt::{self, Display, Formatter},
    sync::Arc,
};

/// One of a sample's chromosome copies. A haploid sample carries a single gamete
/// (`gamete_index == 0`); a diploid sample carries two (`0` and `1`).
///
/// `sample` is an `Arc<str>` rather than an owned `String` since the same sample name
/// is repeated at every reference range the graph knows about -- cloning a
/// `SampleGamete` should stay cheap.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SampleGamete {
    pub sample: Arc<str>,
    pub gamete_index: u8,
}

impl SampleGamete {
    #[must_use]
    pub fn new(sample: impl Into<Arc<str>>, gamete_index: u8) -> Self {
        Self { sample: sample.into(), gamete_index }
    }
}

impl Display for SampleGamete {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.sample, self.gamete_index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn orders_by_sample_then_gamete() {
        let a0 = SampleGamete::new("A", 0);
        let a1 = SampleGamete::new("A", 1);
        let b0 = SampleGamete::new("B", 0);
        let mut gametes = vec![b0.clone(), a1.clone(), a0.clone()];
        gametes.sort();
        assert_eq!(gametes, vec![a0, a1, b0]);
    }
}

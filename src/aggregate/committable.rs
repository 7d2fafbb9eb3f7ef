use super::AggregateRoot;

/// Trait for values that can be committed as one transaction.
///
/// Implemented for single aggregates by
/// [`impl_aggregate_root!`](crate::impl_aggregate_root) and for collections of
/// `&mut dyn AggregateRoot`, so different aggregate types can share a commit.
pub trait Committable {
    fn aggregates_mut(&mut self) -> Vec<&mut dyn AggregateRoot>;
}

impl<'a> Committable for [&'a mut dyn AggregateRoot] {
    fn aggregates_mut(&mut self) -> Vec<&mut dyn AggregateRoot> {
        self.iter_mut()
            .map(|a| &mut **a as &mut dyn AggregateRoot)
            .collect()
    }
}

impl<'a, const N: usize> Committable for [&'a mut dyn AggregateRoot; N] {
    fn aggregates_mut(&mut self) -> Vec<&mut dyn AggregateRoot> {
        self.iter_mut()
            .map(|a| &mut **a as &mut dyn AggregateRoot)
            .collect()
    }
}

impl<'a> Committable for Vec<&'a mut dyn AggregateRoot> {
    fn aggregates_mut(&mut self) -> Vec<&mut dyn AggregateRoot> {
        self.iter_mut()
            .map(|a| &mut **a as &mut dyn AggregateRoot)
            .collect()
    }
}

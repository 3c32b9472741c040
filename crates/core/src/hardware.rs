use serde::{Deserialize, Serialize};

/// Logical core identifier, unique within a machine.
pub type CoreId = u32;

/// One allocatable unit of compute: a physical core's hardware threads or a
/// NUMA-local group. Ids are kept in probe order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CpuGroup {
    pub ids: Vec<CoreId>,
}

impl CpuGroup {
    pub fn new(ids: impl Into<Vec<CoreId>>) -> Self {
        Self { ids: ids.into() }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Read-only description of the machine a run is scheduled on.
///
/// Built once at startup by a probe and never mutated afterwards. GPU
/// availability is a capability flag resolved at construction: a machine
/// without a GPU toolkit simply reports `has_gpu_support == false`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareInventory {
    pub cpus: Vec<CpuGroup>,
    pub gpu_count: usize,
    pub has_gpu_support: bool,
}

impl HardwareInventory {
    pub fn new(cpus: Vec<CpuGroup>) -> Self {
        Self {
            cpus,
            gpu_count: 0,
            has_gpu_support: false,
        }
    }

    /// `n` groups holding one core each, ids `0..n`.
    pub fn single_core_groups(n: usize) -> Self {
        Self::new((0..n as CoreId).map(|id| CpuGroup::new(vec![id])).collect())
    }

    pub fn with_gpus(mut self, count: usize) -> Self {
        self.gpu_count = count;
        self.has_gpu_support = true;
        self
    }

    /// Total number of usable logical cores across every group.
    pub fn total_cores(&self) -> usize {
        self.cpus.iter().map(CpuGroup::len).sum()
    }

    /// All core ids flattened in group order.
    pub fn core_ids(&self) -> Vec<CoreId> {
        self.cpus.iter().flat_map(|g| g.ids.iter().copied()).collect()
    }

    /// GPUs usable by a stage; zero when the machine has no GPU support.
    pub fn available_gpus(&self) -> usize {
        if self.has_gpu_support {
            self.gpu_count
        } else {
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flattened_ids_keep_group_order() {
        let inv = HardwareInventory::new(vec![
            CpuGroup::new(vec![0, 4]),
            CpuGroup::new(vec![1, 5]),
            CpuGroup::new(vec![2, 6]),
        ]);
        assert_eq!(inv.total_cores(), 6);
        assert_eq!(inv.core_ids(), vec![0, 4, 1, 5, 2, 6]);
    }

    #[test]
    fn gpus_hidden_without_support() {
        let mut inv = HardwareInventory::single_core_groups(2);
        inv.gpu_count = 4;
        assert_eq!(inv.available_gpus(), 0);

        let inv = HardwareInventory::single_core_groups(2).with_gpus(4);
        assert_eq!(inv.available_gpus(), 4);
    }

    #[test]
    fn single_core_groups_ids() {
        let inv = HardwareInventory::single_core_groups(3);
        assert_eq!(inv.cpus.len(), 3);
        assert_eq!(inv.core_ids(), vec![0, 1, 2]);
        assert!(!inv.has_gpu_support);
    }
}

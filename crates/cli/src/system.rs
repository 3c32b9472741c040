//! Hardware probing. Runs once at startup and produces the immutable
//! [`HardwareInventory`] every stage plans against.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;
use std::process::Command;

use shardrun_core::{CoreId, CpuGroup, HardwareInventory};
use tracing::{debug, warn};

const SYSFS_CPU_ROOT: &str = "/sys/devices/system/cpu";

/// Probe CPU groups and GPUs. `gpu_override` skips GPU detection.
pub fn probe(gpu_override: Option<usize>) -> HardwareInventory {
    let cpus = probe_cpu_groups();
    let gpus = match gpu_override {
        Some(n) => Some(n),
        None => probe_gpu_count(),
    };

    let mut inventory = HardwareInventory::new(cpus);
    if let Some(n) = gpus {
        inventory = inventory.with_gpus(n);
    }
    debug!(
        groups = inventory.cpus.len(),
        cores = inventory.total_cores(),
        gpus = inventory.available_gpus(),
        gpu_support = inventory.has_gpu_support,
        "probed hardware"
    );
    inventory
}

/// One group per physical core (its hyperthread siblings), ordered by the
/// lowest id in each group. Falls back to single-core groups.
fn probe_cpu_groups() -> Vec<CpuGroup> {
    match sysfs_cpu_groups(Path::new(SYSFS_CPU_ROOT)) {
        Some(groups) if !groups.is_empty() => groups,
        _ => {
            let n = std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1);
            debug!(cores = n, "sysfs topology unavailable, assuming single-core groups");
            HardwareInventory::single_core_groups(n).cpus
        }
    }
}

fn sysfs_cpu_groups(root: &Path) -> Option<Vec<CpuGroup>> {
    let online = fs::read_to_string(root.join("online")).ok()?;
    let mut groups = BTreeSet::new();
    for id in parse_cpu_list(&online)? {
        let siblings_path = root
            .join(format!("cpu{id}"))
            .join("topology/thread_siblings_list");
        let siblings = match fs::read_to_string(&siblings_path) {
            Ok(text) => parse_cpu_list(&text)?,
            Err(_) => vec![id],
        };
        groups.insert(siblings);
    }
    Some(groups.into_iter().map(CpuGroup::new).collect())
}

/// Parse a kernel cpu list such as `0-3,8,10-11`.
pub fn parse_cpu_list(text: &str) -> Option<Vec<CoreId>> {
    let mut ids = Vec::new();
    for part in text.trim().split(',').filter(|p| !p.is_empty()) {
        match part.split_once('-') {
            Some((lo, hi)) => {
                let lo: CoreId = lo.trim().parse().ok()?;
                let hi: CoreId = hi.trim().parse().ok()?;
                if hi < lo {
                    return None;
                }
                ids.extend(lo..=hi);
            }
            None => ids.push(part.trim().parse().ok()?),
        }
    }
    ids.sort_unstable();
    ids.dedup();
    Some(ids)
}

/// GPU count from `CUDA_VISIBLE_DEVICES`, else `nvidia-smi -L`. `None`
/// means no GPU support on this machine.
fn probe_gpu_count() -> Option<usize> {
    if let Ok(visible) = std::env::var("CUDA_VISIBLE_DEVICES") {
        return Some(count_visible_devices(&visible));
    }
    match Command::new("nvidia-smi").arg("-L").output() {
        Ok(out) if out.status.success() => {
            let listing = String::from_utf8_lossy(&out.stdout);
            Some(listing.lines().filter(|l| l.starts_with("GPU ")).count())
        }
        Ok(out) => {
            warn!(status = %out.status, "nvidia-smi failed, GPU stages will be empty");
            None
        }
        Err(_) => None,
    }
}

fn count_visible_devices(value: &str) -> usize {
    value
        .split(',')
        .map(str::trim)
        .filter(|d| !d.is_empty() && *d != "-1")
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpu_list_ranges() {
        assert_eq!(parse_cpu_list("0-3,8,10-11\n"), Some(vec![0, 1, 2, 3, 8, 10, 11]));
        assert_eq!(parse_cpu_list("5"), Some(vec![5]));
        assert_eq!(parse_cpu_list(""), Some(vec![]));
        assert_eq!(parse_cpu_list("3-1"), None);
        assert_eq!(parse_cpu_list("a-b"), None);
    }

    #[test]
    fn sysfs_siblings_grouped() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path();
        fs::write(root.join("online"), "0-3\n").unwrap();
        for (cpu, siblings) in [(0, "0,2"), (1, "1,3"), (2, "0,2"), (3, "1,3")] {
            let topo = root.join(format!("cpu{cpu}/topology"));
            fs::create_dir_all(&topo).unwrap();
            fs::write(topo.join("thread_siblings_list"), siblings).unwrap();
        }

        let groups = sysfs_cpu_groups(root).unwrap();
        assert_eq!(groups, vec![CpuGroup::new(vec![0, 2]), CpuGroup::new(vec![1, 3])]);
    }

    #[test]
    fn missing_sysfs_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(sysfs_cpu_groups(dir.path()).is_none());
    }

    #[test]
    fn visible_devices_counted() {
        assert_eq!(count_visible_devices("0,1,3"), 3);
        assert_eq!(count_visible_devices(""), 0);
        assert_eq!(count_visible_devices("-1"), 0);
    }

    #[test]
    fn override_sets_gpu_support() {
        let inv = probe(Some(2));
        assert!(inv.has_gpu_support);
        assert_eq!(inv.available_gpus(), 2);
        assert!(inv.total_cores() > 0);
    }
}

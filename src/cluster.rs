// Static cluster description shown alongside the telemetry. Nothing in the
// sampling path reads or writes it.

pub const CLUSTER_TITLE: &str = "vLLM Ray Cluster Dashboard";
pub const CLUSTER_SUBTITLE: &str = "Run:AI GPU Partitioning • 2x 0.5 GPU • Model: facebook/opt-125m";
pub const TOTAL_GPUS: &str = "1.0 GPU (2x 0.5)";

#[derive(Debug, Clone, Copy)]
pub struct Application {
    pub name: &'static str,
    pub status: &'static str,
    pub gpu_share: &'static str,
    pub memory: &'static str,
    pub uptime: &'static str,
    /// GPU utilisation percent
    pub gpu_util: u16,
}

pub const APPLICATIONS: [Application; 2] = [
    Application {
        name: "vllm-head",
        status: "running",
        gpu_share: "0.5",
        memory: "8.2/16 GB",
        uptime: "2h 15m",
        gpu_util: 78,
    },
    Application {
        name: "vllm-worker-1",
        status: "running",
        gpu_share: "0.5",
        memory: "7.8/16 GB",
        uptime: "2h 15m",
        gpu_util: 82,
    },
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeRole {
    Head,
    Worker,
}

#[derive(Debug, Clone, Copy)]
pub struct Node {
    pub name: &'static str,
    pub role: NodeRole,
    pub active: bool,
    /// Position as fractions of the topology area, origin top-left.
    pub x: f64,
    pub y: f64,
}

pub const NODES: [Node; 9] = [
    Node { name: "vllm-head", role: NodeRole::Head, active: true, x: 0.50, y: 0.50 },
    Node { name: "worker-1", role: NodeRole::Worker, active: true, x: 0.25, y: 0.25 },
    Node { name: "worker-2", role: NodeRole::Worker, active: false, x: 0.75, y: 0.25 },
    Node { name: "worker-3", role: NodeRole::Worker, active: false, x: 0.25, y: 0.75 },
    Node { name: "worker-4", role: NodeRole::Worker, active: false, x: 0.75, y: 0.75 },
    Node { name: "worker-5", role: NodeRole::Worker, active: false, x: 0.50, y: 0.15 },
    Node { name: "worker-6", role: NodeRole::Worker, active: false, x: 0.50, y: 0.85 },
    Node { name: "worker-7", role: NodeRole::Worker, active: false, x: 0.10, y: 0.50 },
    Node { name: "worker-8", role: NodeRole::Worker, active: false, x: 0.90, y: 0.50 },
];

/// Links drawn between active nodes, as indices into `NODES`.
pub const LINKS: [(usize, usize); 1] = [(1, 0)];

pub fn active_nodes() -> usize {
    NODES.iter().filter(|n| n.active).count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_join_active_nodes() {
        for (a, b) in LINKS {
            assert!(NODES[a].active && NODES[b].active);
        }
        assert_eq!(active_nodes(), 2);
        assert_eq!(NODES.iter().filter(|n| n.role == NodeRole::Head).count(), 1);
    }
}

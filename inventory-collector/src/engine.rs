//! Engine families and the metrics that apply to each.
//!
//! RDS serves several engines through one API, but CloudWatch publishes
//! storage and throughput under different names per engine:
//!
//! | Family | Namespace | Size metric | Reduction | Read / write metric |
//! |--------|-----------|-------------|-----------|---------------------|
//! | standard | `AWS/RDS` | `FreeStorageSpace` | minimum | `ReadIOPS` / `WriteIOPS` |
//! | document | `AWS/DocDB` | `VolumeBytesUsed` | maximum | `ReadIOPS` / `WriteIOPS` |
//! | clustered | `AWS/RDS` | `VolumeBytesUsed` | maximum | `VolumeReadIOPs` / `VolumeWriteIOPs` |

use serde::Serialize;

pub const INSTANCE_DIMENSION: &str = "DBInstanceIdentifier";
pub const CLUSTER_DIMENSION: &str = "DBClusterIdentifier";
pub const CONNECTIONS_METRIC: &str = "DatabaseConnections";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineFamily {
    /// mysql, postgres, mariadb, oracle-*, sqlserver-*
    Standard,
    /// docdb
    Document,
    /// aurora, aurora-mysql, aurora-postgresql
    Clustered,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    Minimum,
    Maximum,
}

/// How the size metric turns into `sizeInBytes`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeDerivation {
    /// allocated capacity minus the free-space reading
    CapacityMinusFree,
    /// the reading is the used size
    UsedBytes,
}

#[derive(Debug)]
pub struct EngineProfile {
    pub family: EngineFamily,
    pub namespace: &'static str,
    pub size_metric: &'static str,
    pub size_dimension: &'static str,
    pub size_reduction: Reduction,
    pub size_derivation: SizeDerivation,
    pub usage_dimension: &'static str,
    pub read_metric: &'static str,
    pub write_metric: &'static str,
}

pub static ENGINE_TABLE: [EngineProfile; 3] = [
    EngineProfile {
        family: EngineFamily::Standard,
        namespace: "AWS/RDS",
        size_metric: "FreeStorageSpace",
        size_dimension: INSTANCE_DIMENSION,
        size_reduction: Reduction::Minimum,
        size_derivation: SizeDerivation::CapacityMinusFree,
        usage_dimension: INSTANCE_DIMENSION,
        read_metric: "ReadIOPS",
        write_metric: "WriteIOPS",
    },
    EngineProfile {
        family: EngineFamily::Document,
        namespace: "AWS/DocDB",
        size_metric: "VolumeBytesUsed",
        size_dimension: CLUSTER_DIMENSION,
        size_reduction: Reduction::Maximum,
        size_derivation: SizeDerivation::UsedBytes,
        usage_dimension: INSTANCE_DIMENSION,
        read_metric: "ReadIOPS",
        write_metric: "WriteIOPS",
    },
    EngineProfile {
        family: EngineFamily::Clustered,
        namespace: "AWS/RDS",
        size_metric: "VolumeBytesUsed",
        size_dimension: CLUSTER_DIMENSION,
        size_reduction: Reduction::Maximum,
        size_derivation: SizeDerivation::UsedBytes,
        usage_dimension: CLUSTER_DIMENSION,
        read_metric: "VolumeReadIOPs",
        write_metric: "VolumeWriteIOPs",
    },
];

impl EngineFamily {
    /// Classify an engine name as reported by DescribeDBInstances/Clusters.
    pub fn classify(engine: &str) -> Self {
        let engine = engine.trim().to_ascii_lowercase();
        if engine == "docdb" {
            EngineFamily::Document
        } else if engine.starts_with("aurora") {
            EngineFamily::Clustered
        } else {
            EngineFamily::Standard
        }
    }

    /// Clusters are volume-backed unless they run the document engine.
    pub fn classify_cluster(engine: &str) -> Self {
        match Self::classify(engine) {
            EngineFamily::Document => EngineFamily::Document,
            _ => EngineFamily::Clustered,
        }
    }

    pub fn profile(self) -> &'static EngineProfile {
        match self {
            EngineFamily::Standard => &ENGINE_TABLE[0],
            EngineFamily::Document => &ENGINE_TABLE[1],
            EngineFamily::Clustered => &ENGINE_TABLE[2],
        }
    }
}

/// Data layer: core types, file discovery and parsing.
///
/// Architecture:
/// ```text
///  mag*.out        corr*-r<n>.out  (one per distance)      *.in
///        │                │                                  │
///        ▼                ▼                                  ▼
///   ┌──────────┐   ┌──────────────┐                   ┌────────────┐
///   │  loader   │   │    loader     │  header + rows    │   loader    │
///   └──────────┘   └──────────────┘  → ColumnTable<T>  └────────────┘
///        │                │                                  │
///        ▼                ▼                                  ▼
///   MagnetizationTable  CorrelationRecord              Parameters
///        └───────┬────────┘
///                ▼
///   ┌────────────────────────┐
///   │ ConnectedCorrelationSet │  distance → 9 connected correlators
///   └────────────────────────┘
/// ```

pub mod error;
pub mod loader;
pub mod model;

pub use error::{Result, SpectrumError};

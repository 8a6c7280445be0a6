//! Wire-level marshaling: type rules, codecs, bind and define buffers.

pub mod bind;
pub mod chunk;
pub mod codec;
pub mod constants;
pub mod define;
pub mod registry;
pub mod sizing;
pub mod types;

pub use bind::{BindSpec, Indicator, Param, ParamValues};
pub use chunk::{ChunkSource, Chunks, TransferStats};
pub use define::DefineSpec;
pub use registry::{Family, TypeRule};
pub use types::{
    ColumnDescriptor, ColumnInfo, ColumnKind, ColumnMetadata, HostValue, LobLocator, Numeric,
    Record,
};

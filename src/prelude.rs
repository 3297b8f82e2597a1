pub use crate::config::{BackendKind, Config, ConfigBuilder, TuningOpts};
pub use crate::device::{DeviceContext, Event};
pub use crate::error::{Error, Result};
pub use crate::fun::{dot_row_col, mdivide_left_tri, mdivide_left_tri_inverse, multiply, multiply_scalar};
pub use crate::kernel::{
    ArgSpec, Direction, KernelArg, KernelCl, NdRange, IN_BUFFER, IN_OUT_BUFFER, OUT_BUFFER, VALUE,
};
pub use crate::matrix::{MatrixCl, TriView};
pub use crate::{init, init_with_config, shutdown};

pub use crate::telemetry::{Metrics, MetricsSnapshot};

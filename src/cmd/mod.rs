//! CLI command implementations.
//!
//! | Module     | Commands handled |
//! |------------|------------------|
//! | `serve`    | `Serve`          |
//! | `generate` | `Generate`       |

pub mod generate;
pub mod serve;

pub use generate::cmd_generate;
pub use serve::cmd_serve;

use rust_embed::RustEmbed;

/// The single-page frontend, compiled into the binary.
#[derive(RustEmbed)]
#[folder = "$CARGO_MANIFEST_DIR/static/"]
pub struct Assets;

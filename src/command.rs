use specta::specta;
use specta_typescript::{BigIntExportBehavior, Typescript};
use tauri::State;
use tauri_specta::{collect_commands, Builder};

use crate::bridge::{BridgeOperation, BridgeReply, DialogPicker, Gateway};

/// Bridge gateway managed by Tauri.
pub struct BridgeState(pub Gateway<DialogPicker<tauri::Wry>>);

/// The single command exposed to the webview.
///
/// Every capability the UI has goes through here as a [`BridgeOperation`].
#[tauri::command]
#[specta]
pub async fn bridge(
  state: State<'_, BridgeState>,
  request: BridgeOperation,
) -> Result<BridgeReply, String> {
  Ok(state.0.handle(request).await)
}

pub fn command_builder() -> Builder {
  let builder = Builder::<tauri::Wry>::new().commands(collect_commands![bridge]);

  #[cfg(debug_assertions)] // <- Only export on non-release builds
  builder
    .export(
      Typescript::default().bigint(BigIntExportBehavior::Number),
      "ui/bindings.ts",
    )
    .expect("Failed to export typescript bindings");
  builder
}

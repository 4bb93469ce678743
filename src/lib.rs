use std::path::PathBuf;
use std::sync::Arc;

mod bridge;
mod command;
mod config;
mod instance;
mod media;
mod protocol;
mod scope;
mod window;

pub use config::AppConfig;
use bridge::{decode_log_payload, DialogPicker, Gateway, LOG_EVENT};
use command::BridgeState;
use instance::{Acquire, Endpoint, InstanceGuard};
use protocol::{MediaSchemeHandler, StreamLimits, MEDIA_SCHEME};
use scope::MediaScope;
use tauri::{Listener, Manager};
use tauri_plugin_log::{Target, TargetKind};
use window::WindowController;

/// Name of the per-user single-instance endpoint.
const INSTANCE_ID: &str = "dev.reelbox.app";

#[cfg_attr(mobile, tauri::mobile_entry_point)]
pub fn run() {
  // Nothing may happen before this check: a second launch only signals and exits
  let guard = match tauri::async_runtime::block_on(InstanceGuard::acquire(&Endpoint::for_app(INSTANCE_ID))) {
    Ok(Acquire::Primary(guard)) => guard,
    Ok(Acquire::Secondary) => return,
    Err(e) => {
      eprintln!("Cannot start: {}", e);
      std::process::exit(1);
    }
  };

  let builder = command::command_builder();

  // Shared between the bridge and the media scheme
  let scope = Arc::new(MediaScope::new());
  let media_handler = Arc::new(MediaSchemeHandler::new(scope.clone(), StreamLimits::default()));
  let handler_for_setup = media_handler.clone();

  tauri::Builder::default()
    .plugin(tauri_plugin_store::Builder::new().build())
    .plugin(tauri_plugin_dialog::init())
    .invoke_handler(builder.invoke_handler())
    .register_asynchronous_uri_scheme_protocol(MEDIA_SCHEME, move |_ctx, request, responder| {
      let handler = media_handler.clone();
      tauri::async_runtime::spawn(async move {
        responder.respond(handler.respond(&request).await);
      });
    })
    .setup(move |app| {
      // Load config from disk (store plugin is now available)
      let loaded = config::load_from_store(app.handle());
      let loaded_config = loaded.config;

      // Setup logging with webview target for in-app log viewing
      app.handle().plugin(
        tauri_plugin_log::Builder::default()
          .level(loaded_config.level_filter().unwrap_or(log::LevelFilter::Info))
          .targets([
            Target::new(TargetKind::Stdout),
            Target::new(TargetKind::Webview),
          ])
          .build(),
      )?;
      for issue in &loaded.issues {
        log::warn!("{}", issue);
      }

      // Installation media root
      let media_root = match loaded_config.media_root.as_ref() {
        Some(root) => PathBuf::from(root),
        None => app.path().resource_dir()?.join("media"),
      };
      if !media_root.is_dir() {
        log::info!("Media root {:?} does not exist", media_root);
      }
      scope.set_install_root(media_root);
      handler_for_setup.configure(StreamLimits::from(&loaded_config));

      app.manage(BridgeState(Gateway::new(
        DialogPicker::new(app.handle().clone()),
        scope.clone(),
        loaded_config.restrict_listing_to_selection,
      )));

      // One-way diagnostics from the webview
      app.listen_any(LOG_EVENT, |event| {
        log::info!(target: "ui", "{}", decode_log_payload(event.payload()));
      });

      // Later launches ask us to show the window
      let (focus_tx, focus_rx) = async_channel::unbounded();
      tauri::async_runtime::spawn(guard.serve(focus_tx));
      tauri::async_runtime::spawn(WindowController::new(app.handle().clone()).run(focus_rx));

      builder.mount_events(app);
      log::info!("Reelbox started");
      Ok(())
    })
    .run(tauri::generate_context!())
    .expect("error while running tauri application");
}

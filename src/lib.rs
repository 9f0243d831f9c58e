/// SIA Quick - Chrome Extension for the SIA student portal
/// Built with Rust + WASM + Yew

mod artifact;
mod background;
mod cache;
mod classify;
mod context;
mod deadline;
mod dispatcher;
mod error;
mod model;
mod navigation;
mod page;
mod settings;
mod source;
mod storage;
mod wait;
pub mod ui;

use chrono::Utc;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;

use crate::background::BackgroundEvent;
use crate::context::ExtensionContext;
use crate::dispatcher::Dispatcher;
use crate::page::WebPage;
use crate::source::BrowserFetcher;
use crate::storage::ChromeStore;
use crate::wait::{BrowserSleeper, CancelToken};

// Set up panic hook for better error messages in the browser console
#[wasm_bindgen(start)]
pub fn main() {
    console_error_panic_hook::set_once();
    wasm_logger::init(wasm_logger::Config::default());
}

// Start the Yew app for the popup
#[wasm_bindgen]
pub fn start_popup() {
    yew::Renderer::<ui::popup::App>::new().render();
}

// One navigation step on each portal page load
#[wasm_bindgen]
pub fn run_content_script() {
    let Some(page) = WebPage::current() else {
        log::warn!("Content script started without a document");
        return;
    };

    let cancel = CancelToken::new();
    if let Some(window) = web_sys::window() {
        let trigger = cancel.clone();
        let on_pagehide = Closure::<dyn FnMut()>::new(move || trigger.cancel());
        let listener: &js_sys::Function = on_pagehide.as_ref().unchecked_ref();
        if let Err(e) = window.add_event_listener_with_callback("pagehide", listener) {
            log::warn!("Failed to watch pagehide: {:?}", e);
        }
        on_pagehide.forget();
    }

    spawn_local(async move {
        let dispatcher = Dispatcher::new(&page, &ChromeStore, &BrowserSleeper).with_cancel(cancel);
        match dispatcher.run().await {
            Ok(outcome) => log::debug!("Dispatch finished: {:?}", outcome),
            Err(e) => log::warn!("Dispatch failed: {}", e),
        }
    });
}

// Background worker events, forwarded by the service worker glue
#[wasm_bindgen]
pub fn on_background_event(kind: String, alarm: Option<String>) {
    let Some(event) = BackgroundEvent::from_js(&kind, alarm) else {
        log::debug!("Ignoring background event {}", kind);
        return;
    };

    spawn_local(async move {
        if event == BackgroundEvent::Installed {
            background::schedule_refresh().await;
        }
        let ctx = ExtensionContext::new(ChromeStore, BrowserFetcher);
        let outcome = background::handle_event(&ctx, &event, Utc::now()).await;
        log::info!("Background {:?}: {:?}", event, outcome);
    });
}

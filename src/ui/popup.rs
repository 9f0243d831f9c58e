/// Popup UI for SIA Quick

use std::collections::HashMap;

use chrono::Utc;
use patternfly_yew::prelude::*;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

use crate::classify::{SubmissionEntry, active_submissions, course_materials, relevant_materials};
use crate::context::{CourseLoad, ExtensionContext, missing_setting};
use crate::navigation::store_target;
use crate::settings::Settings;
use crate::source::BrowserFetcher;
use crate::storage::{COMPLETED_KEY, ChromeStore, DARK_MODE_KEY, EXPANDED_KEY, get_typed, set_typed};
use crate::ui::components::{
    CollapsibleSection, CourseFiles, MaterialList, SubmissionList, format_timestamp,
};
use crate::ui::settings_form::SettingsForm;

pub const PORTAL_ENTRY_URL: &str =
    "https://sia.polytechnic.astra.ac.id/Page_Pelaksanaan_Aktivitas_Pembelajaran.aspx";

const SECTION_MATERIALS: &str = "materials";
const SECTION_SUBMISSIONS: &str = "submissions";
const SECTION_ALL_FILES: &str = "all_files";

// Import JS bridge functions
#[wasm_bindgen(module = "/bridge.js")]
extern "C" {
    #[wasm_bindgen(catch)]
    async fn openTab(url: &str) -> Result<(), JsValue>;
}

#[derive(Clone, PartialEq)]
enum AppState {
    Loading(String),
    Idle,
}

/// Section state as persisted, falling back to the section's default
fn is_expanded(expanded: &HashMap<String, bool>, section: &str) -> bool {
    expanded
        .get(section)
        .copied()
        .unwrap_or(section != SECTION_ALL_FILES)
}

fn toggled(map: &HashMap<String, bool>, key: &str, value: bool) -> HashMap<String, bool> {
    let mut next = map.clone();
    next.insert(key.to_string(), value);
    next
}

/// The theme class lives on `<body>` so the whole popup window follows it
fn apply_dark_mode(enabled: bool) {
    let Some(body) = web_sys::window()
        .and_then(|window| window.document())
        .and_then(|document| document.body())
    else {
        return;
    };
    if let Err(e) = body.class_list().toggle_with_force("dark-mode", enabled) {
        log::warn!("Failed to apply theme: {:?}", e);
    }
}

/// Completion state after marking `key`, keeping only keys of submissions
/// that are still listed
fn completion_update(
    completed: &HashMap<String, bool>,
    listed: &[SubmissionEntry],
    key: &str,
    done: bool,
) -> HashMap<String, bool> {
    let mut next: HashMap<String, bool> = listed
        .iter()
        .map(SubmissionEntry::completion_key)
        .filter_map(|listed_key| {
            let value = completed.get(&listed_key).copied()?;
            Some((listed_key, value))
        })
        .collect();
    next.insert(key.to_string(), done);
    next
}

fn popup_context() -> ExtensionContext<ChromeStore, BrowserFetcher> {
    ExtensionContext::new(ChromeStore, BrowserFetcher)
}

#[function_component(App)]
pub fn app() -> Html {
    let state = use_state(|| AppState::Loading("Loading courses...".to_string()));
    let settings = use_state(Settings::default);
    let load = use_state(CourseLoad::default);
    let dark_mode = use_state(|| false);
    let expanded = use_state(HashMap::<String, bool>::new);
    let completed = use_state(HashMap::<String, bool>::new);
    let show_settings = use_state(|| false);
    let action_error = use_state(|| None::<String>);

    // Restore persisted UI state and load data on mount
    {
        let state = state.clone();
        let settings = settings.clone();
        let load = load.clone();
        let dark_mode = dark_mode.clone();
        let expanded = expanded.clone();
        let completed = completed.clone();

        use_effect_with((), move |_| {
            spawn_local(async move {
                let ctx = popup_context();

                if let Ok(Some(dark)) = get_typed::<bool, _>(&ctx.store, DARK_MODE_KEY).await {
                    dark_mode.set(dark);
                }
                if let Ok(Some(map)) = get_typed(&ctx.store, EXPANDED_KEY).await {
                    expanded.set(map);
                }
                if let Ok(Some(map)) = get_typed(&ctx.store, COMPLETED_KEY).await {
                    completed.set(map);
                }

                let current = match ctx.settings().await {
                    Ok(current) => current,
                    Err(e) => {
                        log::error!("Failed to load settings: {}", e);
                        Settings::default()
                    }
                };
                settings.set(current.clone());

                if missing_setting(&current).is_none() {
                    load.set(ctx.load_courses(&current, Utc::now(), false).await);
                }
                state.set(AppState::Idle);
            });
            || ()
        });
    }

    use_effect_with(*dark_mode, |dark| {
        apply_dark_mode(*dark);
        || ()
    });

    let reload = {
        let state = state.clone();
        let load = load.clone();

        move |current: Settings| {
            let state = state.clone();
            let load = load.clone();

            state.set(AppState::Loading("Refreshing...".to_string()));
            spawn_local(async move {
                if missing_setting(&current).is_none() {
                    load.set(popup_context().load_courses(&current, Utc::now(), true).await);
                }
                state.set(AppState::Idle);
            });
        }
    };

    let on_refresh = {
        let settings = settings.clone();
        let reload = reload.clone();
        Callback::from(move |_: MouseEvent| reload((*settings).clone()))
    };

    let on_toggle_dark = {
        let dark_mode = dark_mode.clone();

        Callback::from(move |_: MouseEvent| {
            let next = !*dark_mode;
            dark_mode.set(next);
            spawn_local(async move {
                if let Err(e) = set_typed(&ChromeStore, DARK_MODE_KEY, &next).await {
                    log::warn!("Failed to save dark mode: {}", e);
                }
            });
        })
    };

    let on_toggle_section = {
        let expanded = expanded.clone();

        Callback::from(move |section: String| {
            let next = toggled(&expanded, &section, !is_expanded(&expanded, &section));
            expanded.set(next.clone());
            spawn_local(async move {
                if let Err(e) = set_typed(&ChromeStore, EXPANDED_KEY, &next).await {
                    log::warn!("Failed to save section state: {}", e);
                }
            });
        })
    };

    let on_toggle_done = {
        let completed = completed.clone();
        let load = load.clone();

        Callback::from(move |(key, done): (String, bool)| {
            let listed = active_submissions(&load.courses, Utc::now());
            let next = completion_update(&completed, &listed, &key, done);
            completed.set(next.clone());
            spawn_local(async move {
                if let Err(e) = set_typed(&ChromeStore, COMPLETED_KEY, &next).await {
                    log::warn!("Failed to save completion state: {}", e);
                }
            });
        })
    };

    let on_submit = {
        let action_error = action_error.clone();

        Callback::from(move |entry: SubmissionEntry| {
            let action_error = action_error.clone();
            spawn_local(async move {
                match open_submission(&entry).await {
                    Ok(()) => action_error.set(None),
                    Err(e) => action_error.set(Some(e)),
                }
            });
        })
    };

    let on_toggle_settings = {
        let show_settings = show_settings.clone();
        Callback::from(move |_: MouseEvent| show_settings.set(!*show_settings))
    };

    let on_save_settings = {
        let settings = settings.clone();
        let show_settings = show_settings.clone();
        let action_error = action_error.clone();
        let reload = reload.clone();

        Callback::from(move |next: Settings| {
            let settings = settings.clone();
            let show_settings = show_settings.clone();
            let action_error = action_error.clone();
            let reload = reload.clone();

            spawn_local(async move {
                match popup_context().save_settings(&settings, next).await {
                    Ok(saved) => {
                        log::info!("Settings saved");
                        settings.set(saved.clone());
                        show_settings.set(false);
                        action_error.set(None);
                        reload(saved);
                    }
                    Err(e) => action_error.set(Some(e.user_message())),
                }
            });
        })
    };

    let on_cancel_settings = {
        let show_settings = show_settings.clone();
        Callback::from(move |_: ()| show_settings.set(false))
    };

    let is_busy = matches!(*state, AppState::Loading(_));
    let missing = missing_setting(&settings);
    let now = Utc::now();
    let materials = relevant_materials(&load.courses, now);
    let submissions = active_submissions(&load.courses, now);
    let listings: Vec<_> = load.courses.iter().map(course_materials).collect();

    html! {
        <div class="padding-20">
            <div class="popup-header">
                <h1 class="popup-title">{"SIA Quick"}</h1>
                <div class="flex-row-gap">
                    <Button onclick={on_refresh} disabled={is_busy || missing.is_some()} variant={ButtonVariant::Secondary}>
                        {"Refresh"}
                    </Button>
                    <Button onclick={on_toggle_dark} variant={ButtonVariant::Secondary}>
                        {if *dark_mode { "Light" } else { "Dark" }}
                    </Button>
                    <Button onclick={on_toggle_settings} variant={ButtonVariant::Secondary}>
                        {"Settings"}
                    </Button>
                </div>
            </div>

            if let Some(name) = missing {
                <Alert r#type={AlertType::Warning} title={format!("Please configure your {} first.", name)} inline={true}>
                    {"The configured data source needs it before courses can be loaded."}
                </Alert>
                <SettingsForm settings={(*settings).clone()} on_save={on_save_settings.clone()} />
            } else {
                if *show_settings {
                    <SettingsForm
                        settings={(*settings).clone()}
                        on_save={on_save_settings}
                        on_cancel={on_cancel_settings}
                    />
                }

                {match &*state {
                    AppState::Loading(msg) => html! {
                        <div class="loading-text-center">
                            <Spinner />
                            <p class="loading-text">{msg}</p>
                        </div>
                    },
                    AppState::Idle => html! {}
                }}

                if let Some(err) = &load.error {
                    <div class="message-top-margin">
                        <Alert r#type={AlertType::Danger} title={err.user_message()} inline={true}>
                            {match &load.fetched_at {
                                Some(ts) => format!("Showing cached data from {}.", format_timestamp(ts)),
                                None => "No cached data available.".to_string(),
                            }}
                        </Alert>
                    </div>
                }

                if let Some(err) = (*action_error).clone() {
                    <Alert r#type={AlertType::Danger} title={"Error"} inline={true}>
                        {err}
                    </Alert>
                }

                <CollapsibleSection
                    id={SECTION_MATERIALS}
                    title="Bahan Ajar & Tugas"
                    count={Some(materials.len())}
                    expanded={is_expanded(&expanded, SECTION_MATERIALS)}
                    on_toggle={on_toggle_section.clone()}
                >
                    <MaterialList items={materials} empty_message="No recent materials." />
                </CollapsibleSection>

                <CollapsibleSection
                    id={SECTION_SUBMISSIONS}
                    title="Pengumpulan Tugas Aktif"
                    count={Some(submissions.len())}
                    expanded={is_expanded(&expanded, SECTION_SUBMISSIONS)}
                    on_toggle={on_toggle_section.clone()}
                >
                    <SubmissionList
                        items={submissions}
                        completed={(*completed).clone()}
                        can_submit={settings.has_credentials()}
                        on_toggle_done={on_toggle_done}
                        on_submit={on_submit}
                    />
                </CollapsibleSection>

                <CollapsibleSection
                    id={SECTION_ALL_FILES}
                    title="All course files"
                    expanded={is_expanded(&expanded, SECTION_ALL_FILES)}
                    on_toggle={on_toggle_section}
                >
                    <CourseFiles listings={listings} />
                </CollapsibleSection>
            }

            <p class="footer-popup">
                {match &load.fetched_at {
                    Some(ts) => format!("SIA Quick v0.1.0 · updated {}", format_timestamp(ts)),
                    None => "SIA Quick v0.1.0".to_string(),
                }}
            </p>
        </div>
    }
}

// Helper functions

async fn open_submission(entry: &SubmissionEntry) -> Result<(), String> {
    store_target(&ChromeStore, &entry.navigation_target())
        .await
        .map_err(|e| format!("Failed to save target: {}", e))?;

    openTab(PORTAL_ENTRY_URL)
        .await
        .map_err(|e| format!("Failed to open portal: {:?}", e))?;

    Ok(())
}

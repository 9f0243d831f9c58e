/// Reusable popup sections and lists

use std::collections::HashMap;

use chrono::{DateTime, Local, Utc};
use patternfly_yew::prelude::*;
use web_sys::HtmlInputElement;
use yew::prelude::*;

use crate::classify::{CourseListing, MaterialEntry, SubmissionEntry, display_meeting_key};

pub fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.with_timezone(&Local).format("%d %b %Y %H:%M").to_string()
}

#[derive(Properties, PartialEq)]
pub struct CollapsibleSectionProps {
    pub id: AttrValue,
    pub title: AttrValue,
    #[prop_or_default]
    pub count: Option<usize>,
    pub expanded: bool,
    pub on_toggle: Callback<String>,
    pub children: Children,
}

#[function_component(CollapsibleSection)]
pub fn collapsible_section(props: &CollapsibleSectionProps) -> Html {
    let onclick = {
        let id = props.id.to_string();
        let on_toggle = props.on_toggle.clone();
        Callback::from(move |_: MouseEvent| on_toggle.emit(id.clone()))
    };

    let title = match props.count {
        Some(count) => format!("{} ({})", props.title, count),
        None => props.title.to_string(),
    };

    html! {
        <div class={classes!("pf-v5-c-expandable-section", props.expanded.then_some("pf-m-expanded"))}>
            <button class="pf-v5-c-expandable-section__toggle" aria-expanded={props.expanded.to_string()} {onclick}>
                <span class="pf-v5-c-expandable-section__toggle-icon">{if props.expanded { "▾" } else { "▸" }}</span>
                <span class="pf-v5-c-expandable-section__toggle-text section-title">{title}</span>
            </button>
            if props.expanded {
                <div class="pf-v5-c-expandable-section__content">
                    {props.children.clone()}
                </div>
            }
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct MaterialListProps {
    pub items: Vec<MaterialEntry>,
    #[prop_or(AttrValue::Static("Nothing to show."))]
    pub empty_message: AttrValue,
}

#[function_component(MaterialList)]
pub fn material_list(props: &MaterialListProps) -> Html {
    if props.items.is_empty() {
        return html! { <p class="empty-text">{props.empty_message.clone()}</p> };
    }

    html! {
        <ul class="item-list">
            {for props.items.iter().map(|item| html! {
                <li class="item-row">
                    {match &item.url {
                        Some(url) => html! {
                            <a href={url.clone()} target="_blank" rel="noopener noreferrer">{&item.label}</a>
                        },
                        None => html! { <span>{&item.label}</span> },
                    }}
                </li>
            })}
        </ul>
    }
}

#[derive(Properties, PartialEq)]
pub struct SubmissionListProps {
    pub items: Vec<SubmissionEntry>,
    pub completed: HashMap<String, bool>,
    /// Without portal credentials the content script cannot log in
    pub can_submit: bool,
    pub on_toggle_done: Callback<(String, bool)>,
    pub on_submit: Callback<SubmissionEntry>,
}

#[function_component(SubmissionList)]
pub fn submission_list(props: &SubmissionListProps) -> Html {
    if props.items.is_empty() {
        return html! { <p class="empty-text">{"No open submissions."}</p> };
    }

    html! {
        <>
            if !props.can_submit {
                <p class="hint-text">{"Add your portal username and password in Settings to enable submit links."}</p>
            }
            <ul class="item-list">
                {for props.items.iter().map(|entry| {
                    let key = entry.completion_key();
                    let done = props.completed.get(&key).copied().unwrap_or(false);

                    let onchange = {
                        let key = key.clone();
                        let on_toggle_done = props.on_toggle_done.clone();
                        Callback::from(move |e: Event| {
                            if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                                on_toggle_done.emit((key.clone(), input.checked()));
                            }
                        })
                    };

                    let onclick = {
                        let entry = entry.clone();
                        let on_submit = props.on_submit.clone();
                        Callback::from(move |_: MouseEvent| on_submit.emit(entry.clone()))
                    };

                    html! {
                        <li key={key.clone()} class={classes!("item-row", done.then_some("item-done"))}>
                            <input type="checkbox" checked={done} {onchange} />
                            <div class="item-body">
                                <span class="item-label">{&entry.label}</span>
                                <span class="item-meta">
                                    {display_meeting_key(&entry.meeting_key)}
                                    if let Some(date) = &entry.meeting_date {
                                        {format!(" · {}", format_timestamp(date))}
                                    }
                                    if let Some(deadline) = &entry.deadline {
                                        {format!(" · due {}", format_timestamp(deadline))}
                                    }
                                </span>
                            </div>
                            <Button variant={ButtonVariant::Link} disabled={!props.can_submit} {onclick}>
                                {"Submit"}
                            </Button>
                        </li>
                    }
                })}
            </ul>
        </>
    }
}

#[derive(Properties, PartialEq)]
pub struct CourseFilesProps {
    pub listings: Vec<CourseListing>,
}

#[function_component(CourseFiles)]
pub fn course_files(props: &CourseFilesProps) -> Html {
    if props.listings.is_empty() {
        return html! { <p class="empty-text">{"No courses loaded."}</p> };
    }

    html! {
        <div class="course-files">
            {for props.listings.iter().map(|listing| html! {
                <details class="course-block">
                    <summary class="course-title">
                        {format!("{} - {}", listing.course_info.kode, listing.course_info.nama)}
                    </summary>
                    {for listing.meetings.iter().filter(|m| !m.items.is_empty()).map(|meeting| html! {
                        <div class="meeting-block">
                            <h4 class="meeting-title">
                                {&meeting.title}
                                if let Some(date) = &meeting.date {
                                    <span class="item-meta">{format!(" ({})", format_timestamp(date))}</span>
                                }
                            </h4>
                            <MaterialList items={meeting.items.clone()} />
                        </div>
                    })}
                </details>
            })}
        </div>
    }
}

/// Settings panel: data source and portal login

use patternfly_yew::prelude::*;
use web_sys::HtmlInputElement;
use yew::prelude::*;

use crate::settings::Settings;
use crate::source::DEFAULT_API_BASE_URL;

#[derive(Clone, Copy, PartialEq)]
enum Field {
    ApiBaseUrl,
    Token,
    Username,
    Password,
    Captcha,
}

impl Field {
    fn get(self, settings: &Settings) -> &Option<String> {
        match self {
            Field::ApiBaseUrl => &settings.api_base_url,
            Field::Token => &settings.token,
            Field::Username => &settings.username,
            Field::Password => &settings.password,
            Field::Captcha => &settings.captcha,
        }
    }

    fn slot(self, settings: &mut Settings) -> &mut Option<String> {
        match self {
            Field::ApiBaseUrl => &mut settings.api_base_url,
            Field::Token => &mut settings.token,
            Field::Username => &mut settings.username,
            Field::Password => &mut settings.password,
            Field::Captcha => &mut settings.captcha,
        }
    }
}

#[derive(Properties, PartialEq)]
pub struct SettingsFormProps {
    pub settings: Settings,
    pub on_save: Callback<Settings>,
    #[prop_or_default]
    pub on_cancel: Option<Callback<()>>,
}

#[function_component(SettingsForm)]
pub fn settings_form(props: &SettingsFormProps) -> Html {
    let draft = use_state(|| props.settings.clone());

    let on_input = {
        let draft = draft.clone();
        move |field: Field| {
            let draft = draft.clone();
            Callback::from(move |e: InputEvent| {
                if let Some(input) = e.target_dyn_into::<HtmlInputElement>() {
                    let mut next = (*draft).clone();
                    *field.slot(&mut next) = Some(input.value());
                    draft.set(next);
                }
            })
        }
    };

    let on_save = {
        let draft = draft.clone();
        let on_save = props.on_save.clone();
        Callback::from(move |_: MouseEvent| on_save.emit((*draft).clone().normalized()))
    };

    let row = |label: &'static str, field: Field, kind: &'static str, placeholder: &'static str| {
        html! {
            <label class="settings-row">
                <span class="settings-label">{label}</span>
                <input
                    class="pf-v5-c-form-control settings-input"
                    type={kind}
                    placeholder={placeholder}
                    value={field.get(&draft).clone().unwrap_or_default()}
                    oninput={on_input(field)}
                />
            </label>
        }
    };

    html! {
        <div class="settings-panel">
            <h2 class="section-title">{"Settings"}</h2>
            {row("API URL", Field::ApiBaseUrl, "url", DEFAULT_API_BASE_URL)}
            {row("Access token", Field::Token, "password", "Only needed for private sources")}
            {row("NIM", Field::Username, "text", "Portal username")}
            {row("Password", Field::Password, "password", "")}
            {row("Captcha", Field::Captcha, "text", "Optional")}
            <div class="flex-row-gap">
                <Button variant={ButtonVariant::Primary} onclick={on_save}>{"Save"}</Button>
                if let Some(on_cancel) = props.on_cancel.clone() {
                    <Button variant={ButtonVariant::Secondary} onclick={Callback::from(move |_: MouseEvent| on_cancel.emit(()))}>
                        {"Cancel"}
                    </Button>
                }
            </div>
        </div>
    }
}

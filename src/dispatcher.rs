/// One navigation step per portal page load, driven by the stored target
use std::sync::LazyLock;

use regex::Regex;

use crate::error::Result;
use crate::model::NavigationTarget;
use crate::navigation::{clear_target, load_target, normalize};
use crate::page::{Page, PageElement};
use crate::settings::Settings;
use crate::storage::KeyValueStore;
use crate::wait::{CancelToken, Sleeper, WaitPolicy, wait_for};

const USERNAME_FIELD: &str = "#txtUsername";
const PASSWORD_FIELD: &str = "#txtPassword";
const CAPTCHA_FIELD: &str = "#txtCaptcha";
const LOGIN_BUTTON: &str = "#MainContent_btnLogin";
const COURSE_ROWS: &str = "#MainContent_gridData tbody tr";
const COURSE_DETAIL_LINK: &str = "a[id*=\"linkDetail\"]";
const MEETING_ROWS: &str = "#MainContent_gridDetail tbody tr";
const MEETING_LINKS: &str = "td:nth-child(2) a";

/// Column holding the course code in the course list grid
const COURSE_CODE_COLUMN: usize = 5;

/// Portal page identities, in the order they are tried
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageKind {
    SsoRoleSelection,
    Login,
    Dashboard,
    CourseList,
    CourseDetail,
}

struct Route {
    kind: PageKind,
    patterns: Vec<Regex>,
}

fn route(kind: PageKind, patterns: &[&str]) -> Route {
    Route {
        kind,
        patterns: patterns
            .iter()
            .map(|p| Regex::new(&format!("(?i){}", p)).expect("route pattern is valid"))
            .collect(),
    }
}

// First match wins: the SSO pages also match the generic login/default
// patterns, so they come first.
static ROUTES: LazyLock<Vec<Route>> = LazyLock::new(|| {
    vec![
        route(PageKind::SsoRoleSelection, &[r"sso/default\.aspx", r"sso/Page_Login\.aspx"]),
        route(PageKind::Login, &[r"Page_Login\.aspx"]),
        route(PageKind::Dashboard, &[r"default\.aspx"]),
        route(PageKind::CourseList, &[r"Page_Pelaksanaan_Aktivitas_Pembelajaran\.aspx"]),
        route(PageKind::CourseDetail, &[r"Page_Pelaksanaan_Aktivitas_Pembelajaran_Detail\.aspx"]),
    ]
});

static STUDENT_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)mahasiswa").expect("student link pattern is valid"));

static SSO_REDIRECT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"sso/Redirect\.aspx\?token=").expect("redirect pattern is valid"));

static COURSE_DELIVERY_MENU: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Pelaksanaan Perkuliahan").expect("menu pattern is valid"));

static LEARNING_ACTIVITY_MENU: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Aktivitas Pembelajaran").expect("menu pattern is valid"));

pub fn classify_url(url: &str) -> Option<PageKind> {
    ROUTES
        .iter()
        .find(|route| route.patterns.iter().any(|p| p.is_match(url)))
        .map(|route| route.kind)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step changed the page (filled, clicked or navigated)
    Acted,
    /// The page did not have what the step needed
    NotApplicable,
    /// The submission link was clicked and the target consumed
    Completed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    NoTarget,
    UnknownPage,
    Step(PageKind, StepOutcome),
}

enum RoleAction<E> {
    Click(E),
    Navigate(String),
}

fn find_link<P: Page>(page: &P, pattern: &Regex) -> Option<P::Element> {
    page.query_all("a")
        .into_iter()
        .find(|a| pattern.is_match(&a.text()))
}

pub struct Dispatcher<'a, P: Page, S: KeyValueStore, K: Sleeper> {
    pub page: &'a P,
    pub store: &'a S,
    pub sleeper: &'a K,
    pub policy: WaitPolicy,
    pub cancel: CancelToken,
}

impl<'a, P: Page, S: KeyValueStore, K: Sleeper> Dispatcher<'a, P, S, K> {
    pub fn new(page: &'a P, store: &'a S, sleeper: &'a K) -> Self {
        Dispatcher {
            page,
            store,
            sleeper,
            policy: WaitPolicy::default(),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Perform at most one step for the current page
    pub async fn run(&self) -> Result<DispatchOutcome> {
        let target = match load_target(self.store).await? {
            Some(target) if target.is_complete() => target,
            _ => return Ok(DispatchOutcome::NoTarget),
        };

        let url = self.page.url();
        let Some(kind) = classify_url(&url) else {
            log::debug!("No navigation step for {}", url);
            return Ok(DispatchOutcome::UnknownPage);
        };

        log::debug!("Page {:?} for target {:?}", kind, target);
        let outcome = self.run_step(kind, &target).await?;
        log::debug!("Step {:?} finished: {:?}", kind, outcome);

        Ok(DispatchOutcome::Step(kind, outcome))
    }

    pub async fn run_step(&self, kind: PageKind, target: &NavigationTarget) -> Result<StepOutcome> {
        match kind {
            PageKind::Login => self.step_login().await,
            PageKind::SsoRoleSelection => Ok(self.step_role_selection().await),
            PageKind::Dashboard => Ok(self.step_dashboard().await),
            PageKind::CourseList => Ok(self.step_course_list(target).await),
            PageKind::CourseDetail => self.step_course_detail(target).await,
        }
    }

    async fn wait<T>(&self, what: &str, check: impl FnMut() -> Option<T>) -> Option<T> {
        match wait_for(self.sleeper, self.policy, &self.cancel, check).await {
            Ok(found) => Some(found),
            Err(e) => {
                log::debug!("Gave up waiting for {}: {}", what, e);
                None
            }
        }
    }

    async fn step_login(&self) -> Result<StepOutcome> {
        let settings = Settings::load(self.store).await?;
        let Some(credentials) = settings.credentials() else {
            log::warn!("No portal credentials configured, leaving login page alone");
            return Ok(StepOutcome::NotApplicable);
        };

        let page = self.page;
        let form = self
            .wait("login form", || {
                Some((
                    page.query(USERNAME_FIELD)?,
                    page.query(PASSWORD_FIELD)?,
                    page.query(LOGIN_BUTTON)?,
                ))
            })
            .await;
        let Some((username, password, button)) = form else {
            return Ok(StepOutcome::NotApplicable);
        };

        username.set_value(credentials.username);
        password.set_value(credentials.password);
        if let (Some(captcha), Some(field)) = (credentials.captcha, page.query(CAPTCHA_FIELD)) {
            field.set_value(captcha);
        }
        button.click();

        Ok(StepOutcome::Acted)
    }

    async fn step_role_selection(&self) -> StepOutcome {
        let page = self.page;
        let action = self
            .wait("role selection link", || {
                let anchors = page.query_all("a");
                let redirect = anchors
                    .iter()
                    .find_map(|a| a.href().filter(|href| SSO_REDIRECT.is_match(href)));
                anchors
                    .into_iter()
                    .find(|a| STUDENT_LINK.is_match(&a.text()))
                    .map(RoleAction::Click)
                    .or(redirect.map(RoleAction::Navigate))
            })
            .await;

        match action {
            Some(RoleAction::Click(link)) => link.click(),
            Some(RoleAction::Navigate(href)) => page.navigate(&href),
            None => return StepOutcome::NotApplicable,
        }
        StepOutcome::Acted
    }

    async fn step_dashboard(&self) -> StepOutcome {
        let page = self.page;
        let Some(menu) = self
            .wait("course delivery menu", || find_link(page, &COURSE_DELIVERY_MENU))
            .await
        else {
            return StepOutcome::NotApplicable;
        };
        menu.click();

        if let Some(activity) = self
            .wait("learning activity menu", || find_link(page, &LEARNING_ACTIVITY_MENU))
            .await
        {
            activity.click();
        }
        StepOutcome::Acted
    }

    async fn step_course_list(&self, target: &NavigationTarget) -> StepOutcome {
        let page = self.page;
        let kode = normalize(&target.kode);

        let detail = self
            .wait("course row", || {
                page.query_all(COURSE_ROWS).into_iter().find_map(|row| {
                    let cells = row.query_all("td");
                    let code = cells.get(COURSE_CODE_COLUMN)?;
                    if normalize(&code.text()).contains(&kode) {
                        row.query(COURSE_DETAIL_LINK)
                    } else {
                        None
                    }
                })
            })
            .await;

        match detail {
            Some(link) => {
                link.click();
                StepOutcome::Acted
            }
            None => StepOutcome::NotApplicable,
        }
    }

    async fn step_course_detail(&self, target: &NavigationTarget) -> Result<StepOutcome> {
        let page = self.page;
        let pertemuan = normalize(&target.pertemuan);
        let pengumpulan = normalize(&target.pengumpulan);

        let link = self
            .wait("submission link", || {
                page.query_all(MEETING_ROWS).into_iter().find_map(|row| {
                    let info = row.query("td")?;
                    if !normalize(&info.text()).contains(&pertemuan) {
                        return None;
                    }
                    row.query_all(MEETING_LINKS)
                        .into_iter()
                        .find(|a| normalize(&a.text()).contains(&pengumpulan))
                })
            })
            .await;

        let Some(link) = link else {
            return Ok(StepOutcome::NotApplicable);
        };

        link.click();
        clear_target(self.store).await?;
        log::info!("Reached submission {} for {}", target.pengumpulan, target.kode);

        Ok(StepOutcome::Completed)
    }
}

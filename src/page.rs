/// The slice of the DOM the navigation steps need, behind a trait so every
/// step can run against a synthetic page in tests
use wasm_bindgen::JsCast;
use web_sys::{Document, Element, HtmlAnchorElement, HtmlElement, HtmlInputElement, Window};

pub trait PageElement: Sized {
    /// Visible text content
    fn text(&self) -> String;
    /// Resolved link target, for anchors
    fn href(&self) -> Option<String>;
    fn set_value(&self, value: &str);
    fn click(&self);
    fn query(&self, selector: &str) -> Option<Self>;
    fn query_all(&self, selector: &str) -> Vec<Self>;
}

pub trait Page {
    type Element: PageElement;

    fn url(&self) -> String;
    fn query(&self, selector: &str) -> Option<Self::Element>;
    fn query_all(&self, selector: &str) -> Vec<Self::Element>;
    fn navigate(&self, href: &str);
}

/// The live document the content script runs in
pub struct WebPage {
    window: Window,
    document: Document,
}

impl WebPage {
    pub fn current() -> Option<WebPage> {
        let window = web_sys::window()?;
        let document = window.document()?;
        Some(WebPage { window, document })
    }
}

#[derive(Clone)]
pub struct WebElement(Element);

fn collect_elements(list: Result<web_sys::NodeList, wasm_bindgen::JsValue>) -> Vec<WebElement> {
    let Ok(list) = list else {
        return Vec::new();
    };
    (0..list.length())
        .filter_map(|i| list.item(i))
        .filter_map(|node| node.dyn_into::<Element>().ok())
        .map(WebElement)
        .collect()
}

impl PageElement for WebElement {
    fn text(&self) -> String {
        self.0.text_content().unwrap_or_default()
    }

    fn href(&self) -> Option<String> {
        match self.0.dyn_ref::<HtmlAnchorElement>() {
            Some(anchor) => Some(anchor.href()),
            None => self.0.get_attribute("href"),
        }
    }

    fn set_value(&self, value: &str) {
        if let Some(input) = self.0.dyn_ref::<HtmlInputElement>() {
            input.set_value(value);
        }
    }

    fn click(&self) {
        if let Some(el) = self.0.dyn_ref::<HtmlElement>() {
            el.click();
        }
    }

    fn query(&self, selector: &str) -> Option<Self> {
        self.0.query_selector(selector).ok().flatten().map(WebElement)
    }

    fn query_all(&self, selector: &str) -> Vec<Self> {
        collect_elements(self.0.query_selector_all(selector))
    }
}

impl Page for WebPage {
    type Element = WebElement;

    fn url(&self) -> String {
        self.window.location().href().unwrap_or_default()
    }

    fn query(&self, selector: &str) -> Option<WebElement> {
        self.document.query_selector(selector).ok().flatten().map(WebElement)
    }

    fn query_all(&self, selector: &str) -> Vec<WebElement> {
        collect_elements(self.document.query_selector_all(selector))
    }

    fn navigate(&self, href: &str) {
        if let Err(e) = self.window.location().set_href(href) {
            log::warn!("Failed to navigate to {}: {:?}", href, e);
        }
    }
}

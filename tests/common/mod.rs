//! Scripted in-memory browser for engine tests.
#![allow(dead_code)]

use async_trait::async_trait;
use repro_runner::{
    Driver, ElementHandle, EngineSettings, Error, FsArtifactStore, Locator, MemorySink, Result,
    Runner, WaitState,
};
use std::cell::{Cell, RefCell};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

#[derive(Debug, Clone)]
pub struct El {
    pub text: String,
    pub visible: bool,
    pub editable: bool,
    pub inactive_pane: bool,
    /// When set, `fill` stores this instead of what was typed.
    pub sticky_value: Option<String>,
    pub value: String,
}

impl El {
    pub fn new(text: &str) -> Self {
        Self {
            text: text.to_string(),
            visible: true,
            editable: false,
            inactive_pane: false,
            sticky_value: None,
            value: String::new(),
        }
    }

    pub fn input() -> Self {
        Self {
            editable: true,
            ..Self::new("")
        }
    }

    pub fn hidden(mut self) -> Self {
        self.visible = false;
        self
    }

    pub fn in_inactive_pane(mut self) -> Self {
        self.inactive_pane = true;
        self
    }

    pub fn sticky(mut self, value: &str) -> Self {
        self.sticky_value = Some(value.to_string());
        self
    }
}

type Matcher = Box<dyn Fn(&Locator) -> bool>;

#[derive(Default)]
pub struct FakeDriver {
    elements: RefCell<Vec<El>>,
    rules: RefCell<Vec<(Matcher, u64)>>,
    calls: RefCell<Vec<String>>,
    waits: RefCell<Vec<u64>>,
    clicked: RefCell<Vec<u64>>,
    page_text: RefCell<String>,
    navigate_error: RefCell<Option<String>>,
    session_lost: Cell<bool>,
    lose_session_on_click: Cell<bool>,
    idle_times_out: Cell<bool>,
}

impl FakeDriver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element found by every locator `matcher` accepts.
    pub fn when(&self, matcher: impl Fn(&Locator) -> bool + 'static, el: El) -> u64 {
        let mut elements = self.elements.borrow_mut();
        elements.push(el);
        let id = elements.len() as u64;
        self.rules.borrow_mut().push((Box::new(matcher), id));
        id
    }

    /// Add an element found by exactly this locator.
    pub fn at(&self, locator: &str, el: El) -> u64 {
        let wanted = Locator::parse(locator);
        self.when(move |l| *l == wanted, el)
    }

    /// Make an existing element also match `matcher`.
    pub fn also(&self, id: u64, matcher: impl Fn(&Locator) -> bool + 'static) {
        self.rules.borrow_mut().push((Box::new(matcher), id));
    }

    pub fn set_page_text(&self, text: &str) {
        *self.page_text.borrow_mut() = text.to_string();
    }

    pub fn fail_navigation(&self, message: &str) {
        *self.navigate_error.borrow_mut() = Some(message.to_string());
    }

    pub fn lose_session_on_click(&self) {
        self.lose_session_on_click.set(true);
    }

    pub fn idle_times_out(&self) {
        self.idle_times_out.set(true);
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls
            .borrow()
            .iter()
            .filter(|c| c.split_whitespace().next() == Some(name))
            .count()
    }

    pub fn waits(&self) -> Vec<u64> {
        self.waits.borrow().clone()
    }

    pub fn clicked(&self) -> Vec<u64> {
        self.clicked.borrow().clone()
    }

    pub fn value_of(&self, id: u64) -> String {
        self.elements.borrow()[id as usize - 1].value.clone()
    }

    fn record(&self, call: String) -> Result<()> {
        self.calls.borrow_mut().push(call);
        if self.session_lost.get() {
            return Err(Error::Driver("connection closed".into()));
        }
        Ok(())
    }

    fn el(&self, handle: &ElementHandle) -> Result<El> {
        self.elements
            .borrow()
            .get(handle.id as usize - 1)
            .cloned()
            .ok_or_else(|| Error::LocatorNotFound(handle.css()))
    }

    fn matching(&self, locator: &Locator) -> Vec<ElementHandle> {
        let mut ids: Vec<u64> = Vec::new();
        for (matcher, id) in self.rules.borrow().iter() {
            if matcher(locator) && !ids.contains(id) {
                ids.push(*id);
            }
        }
        ids.into_iter().map(ElementHandle::new).collect()
    }
}

#[async_trait(?Send)]
impl Driver for FakeDriver {
    async fn navigate(&self, url: &str, _timeout: Duration) -> Result<()> {
        self.record(format!("navigate {url}"))?;
        match self.navigate_error.borrow().as_ref() {
            Some(message) => Err(Error::Navigation(message.clone())),
            None => Ok(()),
        }
    }

    async fn query_all(&self, locator: &Locator) -> Result<Vec<ElementHandle>> {
        self.record(format!("query_all {locator}"))?;
        Ok(self.matching(locator))
    }

    async fn wait_for(
        &self,
        locator: &Locator,
        state: WaitState,
        _timeout: Duration,
    ) -> Result<ElementHandle> {
        self.record(format!("wait_for {locator}"))?;
        let found = self.matching(locator);
        for handle in &found {
            let el = self.el(handle)?;
            let ok = match state {
                WaitState::Attached => true,
                WaitState::Visible => el.visible,
                WaitState::Editable => el.visible && el.editable,
            };
            if ok {
                return Ok(*handle);
            }
        }
        if found.is_empty() {
            Err(Error::LocatorNotFound(format!("{locator} matched nothing")))
        } else {
            Err(Error::Timeout(format!("{locator} not {state}")))
        }
    }

    async fn is_visible(&self, element: &ElementHandle) -> Result<bool> {
        self.record(format!("is_visible {}", element.id))?;
        Ok(self.el(element)?.visible)
    }

    async fn text_content(&self, element: &ElementHandle) -> Result<Option<String>> {
        self.record(format!("text_content {}", element.id))?;
        Ok(Some(self.el(element)?.text))
    }

    async fn fill(&self, element: &ElementHandle, value: &str) -> Result<()> {
        self.record(format!("fill {}", element.id))?;
        let mut elements = self.elements.borrow_mut();
        let el = &mut elements[element.id as usize - 1];
        if !el.editable {
            return Err(Error::Script("element is not editable".into()));
        }
        el.value = match (&el.sticky_value, value.is_empty()) {
            (Some(sticky), false) => sticky.clone(),
            _ => value.to_string(),
        };
        Ok(())
    }

    async fn read_value(&self, element: &ElementHandle) -> Result<String> {
        self.record(format!("read_value {}", element.id))?;
        Ok(self.el(element)?.value)
    }

    async fn click(&self, element: &ElementHandle) -> Result<()> {
        self.record(format!("click {}", element.id))?;
        if self.lose_session_on_click.get() {
            self.session_lost.set(true);
            return Err(Error::Driver("connection closed".into()));
        }
        self.clicked.borrow_mut().push(element.id);
        Ok(())
    }

    async fn screenshot(&self) -> Result<Vec<u8>> {
        self.record("screenshot".into())?;
        Ok(b"\x89PNG".to_vec())
    }

    async fn evaluate(
        &self,
        script: &str,
        element: Option<&ElementHandle>,
    ) -> Result<serde_json::Value> {
        self.record("evaluate".into())?;
        match element {
            Some(el) if script.contains("closest") => {
                Ok(serde_json::Value::Bool(self.el(el)?.inactive_pane))
            }
            Some(_) => Ok(serde_json::Value::Null),
            None => Ok(serde_json::Value::String(self.page_text.borrow().clone())),
        }
    }

    async fn wait_for_idle(&self, timeout: Duration) -> Result<()> {
        self.record(format!("wait_for_idle {}", timeout.as_millis()))?;
        if self.idle_times_out.get() {
            return Err(Error::Timeout("network busy".into()));
        }
        Ok(())
    }

    async fn wait(&self, ms: u64) {
        self.waits.borrow_mut().push(ms);
    }
}

pub struct Harness {
    pub runner: Runner<FakeDriver>,
    pub events: Arc<MemorySink>,
    pub artifacts: TempDir,
}

impl Harness {
    pub fn new(driver: FakeDriver) -> Self {
        let artifacts = tempfile::tempdir().expect("tempdir");
        let events = Arc::new(MemorySink::new());
        let runner = Runner::new(driver, EngineSettings::default())
            .with_artifacts(FsArtifactStore::new(artifacts.path()))
            .with_sink(events.clone());
        Self {
            runner,
            events,
            artifacts,
        }
    }

    pub fn driver(&self) -> &FakeDriver {
        self.runner.driver()
    }
}

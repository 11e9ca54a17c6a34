//! Element tree standing in for the page the indicators live on, and the
//! render passes that project counts onto it.
//!
//! Rendering never diffs against the previous tree beyond "does the badge
//! exist": badges are created when missing, updated in place, and removed
//! when the count drops to zero. Each pass is idempotent.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

pub const ALERT_CLASS: &str = "bell-alert";
pub const BADGE_CLASS: &str = "bubble";
pub const TASK_ID_ATTR: &str = "data-task-id";
pub const APPROVALS_LINK_ID: &str = "approvals-link";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    pub tag: String,
    pub id: Option<String>,
    pub classes: BTreeSet<String>,
    pub attributes: BTreeMap<String, String>,
    pub text: String,
    pub children: Vec<Element>,
}

impl Element {
    pub fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_string(),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: &str) -> Self {
        self.id = Some(id.to_string());
        self
    }

    pub fn with_class(mut self, class: &str) -> Self {
        self.classes.insert(class.to_string());
        self
    }

    pub fn with_attribute(mut self, name: &str, value: &str) -> Self {
        self.attributes.insert(name.to_string(), value.to_string());
        self
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes.contains(class)
    }

    pub fn set_class(&mut self, class: &str, on: bool) {
        if on {
            self.classes.insert(class.to_string());
        } else {
            self.classes.remove(class);
        }
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    /// First direct child carrying `class`.
    pub fn child_with_class(&self, class: &str) -> Option<&Element> {
        self.children.iter().find(|c| c.has_class(class))
    }

    pub fn badge_text(&self) -> Option<&str> {
        self.child_with_class(BADGE_CLASS).map(|b| b.text.as_str())
    }

    /// Show `count` in a badge child, or drop the badge when `count` is 0.
    fn sync_badge(&mut self, count: u64) {
        let pos = self.children.iter().position(|c| c.has_class(BADGE_CLASS));
        match (count, pos) {
            (0, Some(i)) => {
                self.children.remove(i);
            }
            (0, None) => {}
            (n, Some(i)) => self.children[i].text = n.to_string(),
            (n, None) => {
                let mut badge = Element::new("span").with_class(BADGE_CLASS);
                badge.text = n.to_string();
                self.children.push(badge);
            }
        }
    }

    /// Numeric task id from the id attribute; absent or non-numeric yields `None`.
    fn task_id(&self) -> Option<i64> {
        self.attribute(TASK_ID_ATTR)?.trim().parse().ok()
    }
}

/// Which indicator elements the page carries.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PageLayout {
    #[serde(default = "default_true")]
    pub header_bell: bool,
    #[serde(default)]
    pub approvals_link: bool,
    /// Task id attribute of every card bell, in page order.
    #[serde(default)]
    pub cards: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl Default for PageLayout {
    fn default() -> Self {
        Self {
            header_bell: true,
            approvals_link: false,
            cards: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Page {
    pub header_bell: Option<Element>,
    pub approvals_link: Option<Element>,
    pub card_bells: Vec<Element>,
}

impl Page {
    pub fn from_layout(layout: &PageLayout) -> Self {
        let bell = || Element::new("a").with_class("btn").with_class("bell");
        Self {
            header_bell: layout.header_bell.then(bell),
            approvals_link: layout
                .approvals_link
                .then(|| Element::new("a").with_id(APPROVALS_LINK_ID)),
            card_bells: layout
                .cards
                .iter()
                .map(|id| bell().with_attribute(TASK_ID_ATTR, id))
                .collect(),
        }
    }

    pub fn has_approvals_link(&self) -> bool {
        self.approvals_link.is_some()
    }

    /// Header pass: bell alert class and badge follow `messages`, the
    /// approvals link badge follows `approvals`.
    pub fn render_header(&mut self, messages: u64, approvals: u64) {
        if let Some(bell) = self.header_bell.as_mut() {
            bell.set_class(ALERT_CLASS, messages > 0);
            bell.sync_badge(messages);
        }
        if let Some(link) = self.approvals_link.as_mut() {
            link.sync_badge(approvals);
        }
    }

    /// Card pass: alert class by pending-set membership, badge mirroring the
    /// global unread count on every card.
    pub fn render_cards(&mut self, pending: &HashSet<i64>, last_messages: u64) {
        for bell in &mut self.card_bells {
            let alert = bell.task_id().is_some_and(|id| pending.contains(&id));
            bell.set_class(ALERT_CLASS, alert);
            bell.sync_badge(last_messages);
        }
    }

    /// Startup pass: badges only, alert classes untouched.
    pub fn render_initial_card_badges(&mut self, last_messages: u64) {
        for bell in &mut self.card_bells {
            bell.sync_badge(last_messages);
        }
    }
}

impl fmt::Display for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let badge = |e: &Element| e.badge_text().unwrap_or("-").to_string();
        match &self.header_bell {
            Some(b) => write!(
                f,
                "bell[{}{}]",
                badge(b),
                if b.has_class(ALERT_CLASS) { "!" } else { "" }
            )?,
            None => write!(f, "bell[none]")?,
        }
        if let Some(a) = &self.approvals_link {
            write!(f, " approvals[{}]", badge(a))?;
        }
        let alerting: Vec<&str> = self
            .card_bells
            .iter()
            .filter(|c| c.has_class(ALERT_CLASS))
            .filter_map(|c| c.attribute(TASK_ID_ATTR))
            .collect();
        if !self.card_bells.is_empty() {
            write!(f, " cards[{}] alerting[{}]", self.card_bells.len(), alerting.join(","))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(cards: &[&str]) -> PageLayout {
        PageLayout {
            header_bell: true,
            approvals_link: true,
            cards: cards.iter().map(|s| s.to_string()).collect(),
        }
    }

    #[test]
    fn header_badge_follows_counts() {
        let mut page = Page::from_layout(&layout(&[]));
        page.render_header(4, 2);
        let bell = page.header_bell.as_ref().unwrap();
        assert!(bell.has_class(ALERT_CLASS));
        assert_eq!(bell.badge_text(), Some("4"));
        assert_eq!(page.approvals_link.as_ref().unwrap().badge_text(), Some("2"));

        page.render_header(0, 0);
        let bell = page.header_bell.as_ref().unwrap();
        assert!(!bell.has_class(ALERT_CLASS));
        assert_eq!(bell.badge_text(), None);
        assert!(bell.children.is_empty());
        assert_eq!(page.approvals_link.as_ref().unwrap().badge_text(), None);
    }

    #[test]
    fn repeated_render_keeps_a_single_badge() {
        let mut page = Page::from_layout(&layout(&["1"]));
        for _ in 0..3 {
            page.render_header(5, 1);
            page.render_cards(&HashSet::from([1]), 5);
        }
        assert_eq!(page.header_bell.as_ref().unwrap().children.len(), 1);
        assert_eq!(page.card_bells[0].children.len(), 1);
    }

    #[test]
    fn card_badges_mirror_global_count() {
        let mut page = Page::from_layout(&layout(&["7", "8", "", "x9"]));
        page.render_cards(&HashSet::from([7, 9]), 3);
        let [seven, eight, blank, junk] = &page.card_bells[..] else {
            panic!("expected four cards");
        };
        assert!(seven.has_class(ALERT_CLASS));
        assert!(!eight.has_class(ALERT_CLASS));
        assert!(!blank.has_class(ALERT_CLASS));
        assert!(!junk.has_class(ALERT_CLASS));
        for card in &page.card_bells {
            assert_eq!(card.badge_text(), Some("3"));
        }
    }

    #[test]
    fn initial_badges_leave_alert_classes_alone() {
        let mut page = Page::from_layout(&layout(&["7"]));
        page.render_cards(&HashSet::from([7]), 2);
        page.render_initial_card_badges(0);
        assert!(page.card_bells[0].has_class(ALERT_CLASS));
        assert_eq!(page.card_bells[0].badge_text(), None);
    }

    #[test]
    fn missing_elements_are_skipped() {
        let mut page = Page::from_layout(&PageLayout {
            header_bell: false,
            approvals_link: false,
            cards: vec![],
        });
        page.render_header(3, 3);
        page.render_cards(&HashSet::new(), 3);
        assert_eq!(page, Page::default());
        assert_eq!(page.to_string(), "bell[none]");
    }
}

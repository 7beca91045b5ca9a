//! Site navigation menu.

use std::sync::Arc;

use waypoint_core::Timings;
use waypoint_progress::ProgressContext;

use crate::link::TransitionLink;
use crate::router::Router;

/// Entries shown in the menu, in order.
pub const MENU_ITEMS: [(&str, &str); 3] = [("Home", "/"), ("About", "/about"), ("Contact", "/contact")];

/// The fixed set of transition links.
#[derive(Debug, Clone)]
pub struct NavMenu {
    links: Vec<TransitionLink>,
}

impl NavMenu {
    /// Build every menu link inside the provider subtree `ctx`.
    pub fn new(ctx: &ProgressContext, router: Arc<dyn Router>, timings: &Timings) -> waypoint_progress::Result<Self> {
        let links = MENU_ITEMS
            .iter()
            .map(|(label, href)| {
                TransitionLink::new(ctx, router.clone(), *href, timings).map(|link| link.label(*label))
            })
            .collect::<waypoint_progress::Result<Vec<_>>>()?;
        Ok(Self { links })
    }

    /// All links.
    pub fn links(&self) -> &[TransitionLink] {
        &self.links
    }

    /// Find a link by its label, case-insensitively.
    pub fn find(&self, label: &str) -> Option<&TransitionLink> {
        self.links.iter().find(|l| l.text().eq_ignore_ascii_case(label))
    }
}

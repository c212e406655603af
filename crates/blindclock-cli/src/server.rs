//! In-process stand-in for the tournament server.
//!
//! Renders one level of a [`Structure`] as a timer fragment and answers the
//! widget's next-level fetches the way the real server does: the fragment
//! for the requested level, plus a `countdown::proceed` after-settle trigger
//! when the request carried `proceed=true` and `countdown::reset` otherwise.

use blindclock_core::{MemoryNode, Structure, WidgetConfig};

/// Signal dispatched after the swapped fragment settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Proceed,
    Reset,
}

#[derive(Debug)]
pub struct Response {
    pub level: usize,
    pub nodes: Vec<(String, MemoryNode)>,
    pub trigger: Trigger,
}

pub struct FragmentServer {
    structure: Structure,
    config: WidgetConfig,
}

impl FragmentServer {
    pub fn new(structure: Structure, config: WidgetConfig) -> Self {
        Self { structure, config }
    }

    pub fn structure(&self) -> &Structure {
        &self.structure
    }

    pub fn level_route(index: usize) -> String {
        format!("/play/level/{index}")
    }

    /// Render the fragment for level `index`.
    pub fn render(&self, index: usize) -> Option<Vec<(String, MemoryNode)>> {
        let level = self.structure.get(index)?;
        let ids = &self.config.ids;
        let attrs = &self.config.attributes;
        let classes = &self.config.classes;

        let mut nodes = vec![
            (ids.container.clone(), MemoryNode::new()),
            (
                ids.display.clone(),
                MemoryNode::new()
                    .with_text(level.display())
                    .with_class(classes.running_font.clone())
                    .with_attr(attrs.duration.clone(), level.duration_secs().to_string()),
            ),
            (
                ids.toggle.clone(),
                MemoryNode::new().with_class(classes.play.clone()),
            ),
            (ids.audio_play.clone(), MemoryNode::new()),
            (ids.audio_continue.clone(), MemoryNode::new()),
            (ids.audio_beep.clone(), MemoryNode::new()),
        ];

        if !self.structure.is_last(index) {
            nodes.push((
                ids.next_trigger.clone(),
                MemoryNode::new().with_attr(attrs.next_level.clone(), Self::level_route(index + 1)),
            ));
        }
        Some(nodes)
    }

    /// Answer a GET for `uri`.
    ///
    /// # Errors
    /// Returns an error for unknown routes and out-of-range levels.
    pub fn get(&self, uri: &str) -> Result<Response, String> {
        let (path, query) = uri.split_once('?').unwrap_or((uri, ""));
        let index = path
            .strip_prefix("/play/level/")
            .and_then(|n| n.parse::<usize>().ok())
            .ok_or_else(|| format!("404 not found: {path}"))?;
        let nodes = self
            .render(index)
            .ok_or_else(|| format!("404 no level {index}"))?;

        let proceed = query
            .split('&')
            .filter_map(|pair| pair.split_once('='))
            .any(|(k, v)| k == "proceed" && v.parse::<bool>().unwrap_or(false));

        Ok(Response {
            level: index,
            nodes,
            trigger: if proceed { Trigger::Proceed } else { Trigger::Reset },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn server() -> FragmentServer {
        let structure = Structure::from_toml_str(indoc! {r#"
            name = "Turbo"

            [[levels]]
            level = 1
            small_blind = 10
            big_blind = 20
            duration_min = 5

            [[levels]]
            level = 2
            small_blind = 20
            big_blind = 40
            duration_sec = 90
        "#})
        .unwrap();
        FragmentServer::new(structure, WidgetConfig::default())
    }

    fn node<'a>(nodes: &'a [(String, MemoryNode)], id: &str) -> Option<&'a MemoryNode> {
        nodes.iter().find(|(k, _)| k == id).map(|(_, n)| n)
    }

    #[test]
    fn renders_duration_and_next_target() {
        let nodes = server().render(0).unwrap();
        let timer = node(&nodes, "timer").unwrap();
        assert_eq!(timer.text, "05:00");
        assert_eq!(timer.attributes["data-level-duration-sec"], "300");
        let next = node(&nodes, "trigger-next-timer-level").unwrap();
        assert_eq!(next.attributes["hx-get"], "/play/level/1");
    }

    #[test]
    fn last_level_has_no_next_target() {
        let nodes = server().render(1).unwrap();
        assert!(node(&nodes, "trigger-next-timer-level").is_none());
        assert_eq!(node(&nodes, "timer").unwrap().text, "01:30");
    }

    #[test]
    fn proceed_query_selects_trigger() {
        let s = server();
        assert_eq!(s.get("/play/level/1?proceed=true").unwrap().trigger, Trigger::Proceed);
        assert_eq!(s.get("/play/level/1").unwrap().trigger, Trigger::Reset);
        assert_eq!(s.get("/play/level/1?proceed=nope").unwrap().trigger, Trigger::Reset);
    }

    #[test]
    fn unknown_routes_fail() {
        let s = server();
        assert!(s.get("/play/level/9").is_err());
        assert!(s.get("/dashboard").is_err());
    }
}

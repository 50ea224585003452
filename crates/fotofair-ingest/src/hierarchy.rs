//! In-memory ingestion hierarchy.
//!
//! Classified paths accumulate into a tree of events → flows → speeches →
//! members → media references. Node identity within a parent is exact name
//! equality; the first occurrence creates the node, later occurrences append
//! to it. Sibling order and per-member media order are encounter order,
//! which later becomes the persisted 1-based `order` field.
//!
//! Lookup is a linear scan over siblings (an operator folder holds tens of
//! names, not thousands); nodes own their children outright so the tree is
//! strictly acyclic.

use chrono::{DateTime, Utc};

use crate::classify::ParsedPath;

/// Reference to one photo inside the open archive.
#[derive(Debug, Clone)]
pub struct MediaRef {
    /// Archive entry index, used to pull bytes on demand during persistence.
    pub entry_index: usize,
    pub file_name: String,
}

#[derive(Debug)]
pub struct MemberNode {
    pub name: String,
    pub media: Vec<MediaRef>,
}

#[derive(Debug)]
pub struct SpeechNode {
    pub name: String,
    pub members: Vec<MemberNode>,
}

#[derive(Debug)]
pub struct FlowNode {
    pub name: String,
    pub speeches: Vec<SpeechNode>,
}

#[derive(Debug)]
pub struct EventNode {
    pub name: String,
    /// Attached once when the node is created; later entries for the same
    /// event do not re-validate it.
    pub order_deadline: Option<DateTime<Utc>>,
    pub flows: Vec<FlowNode>,
}

#[derive(Debug, Default)]
pub struct HierarchyTree {
    pub events: Vec<EventNode>,
}

impl HierarchyTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert one classified entry, creating any missing nodes along the way.
    pub fn insert(
        &mut self,
        parsed: ParsedPath,
        entry_index: usize,
        order_deadline: Option<DateTime<Utc>>,
    ) {
        let event_idx = match self.events.iter().position(|e| e.name == parsed.event_name) {
            Some(i) => i,
            None => {
                self.events.push(EventNode {
                    name: parsed.event_name.clone(),
                    order_deadline,
                    flows: Vec::new(),
                });
                self.events.len() - 1
            }
        };
        let event = &mut self.events[event_idx];

        let flow_idx = match event.flows.iter().position(|f| f.name == parsed.flow_name) {
            Some(i) => i,
            None => {
                event.flows.push(FlowNode {
                    name: parsed.flow_name.clone(),
                    speeches: Vec::new(),
                });
                event.flows.len() - 1
            }
        };
        let flow = &mut event.flows[flow_idx];

        let speech_idx = match flow
            .speeches
            .iter()
            .position(|s| s.name == parsed.speech_name)
        {
            Some(i) => i,
            None => {
                flow.speeches.push(SpeechNode {
                    name: parsed.speech_name.clone(),
                    members: Vec::new(),
                });
                flow.speeches.len() - 1
            }
        };
        let speech = &mut flow.speeches[speech_idx];

        let member_idx = match speech
            .members
            .iter()
            .position(|m| m.name == parsed.member_name)
        {
            Some(i) => i,
            None => {
                speech.members.push(MemberNode {
                    name: parsed.member_name.clone(),
                    media: Vec::new(),
                });
                speech.members.len() - 1
            }
        };

        speech.members[member_idx].media.push(MediaRef {
            entry_index,
            file_name: parsed.file_name,
        });
    }

    /// Total number of media references across all members.
    pub fn media_count(&self) -> usize {
        self.events
            .iter()
            .flat_map(|e| &e.flows)
            .flat_map(|f| &f.speeches)
            .flat_map(|s| &s.members)
            .map(|m| m.media.len())
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::classify;

    fn insert(tree: &mut HierarchyTree, path: &str, index: usize) {
        tree.insert(classify(path).unwrap(), index, None);
    }

    #[test]
    fn deduplicates_nodes_by_exact_name() {
        let mut tree = HierarchyTree::new();
        insert(&mut tree, "A/B/C/D/x.jpg", 0);
        insert(&mut tree, "A/B/C/D/y.jpg", 1);

        assert_eq!(tree.events.len(), 1);
        assert_eq!(tree.events[0].flows.len(), 1);
        assert_eq!(tree.events[0].flows[0].speeches.len(), 1);
        assert_eq!(tree.events[0].flows[0].speeches[0].members.len(), 1);
        assert_eq!(tree.media_count(), 2);
    }

    #[test]
    fn distinct_names_create_distinct_siblings() {
        let mut tree = HierarchyTree::new();
        insert(&mut tree, "A/B/C/Jane/p1.jpg", 0);
        insert(&mut tree, "A/B/C/Bob/p1.jpg", 1);
        // Name matching is exact, not case-folded.
        insert(&mut tree, "A/B/C/jane/p1.jpg", 2);

        assert_eq!(tree.events[0].flows[0].speeches[0].members.len(), 3);
    }

    #[test]
    fn media_preserve_encounter_order() {
        let mut tree = HierarchyTree::new();
        insert(&mut tree, "A/B/C/D/third.jpg", 7);
        insert(&mut tree, "A/B/C/D/first.jpg", 2);
        insert(&mut tree, "A/B/C/D/second.jpg", 5);

        let media = &tree.events[0].flows[0].speeches[0].members[0].media;
        let names: Vec<&str> = media.iter().map(|m| m.file_name.as_str()).collect();
        assert_eq!(names, vec!["third.jpg", "first.jpg", "second.jpg"]);
        assert_eq!(media[1].entry_index, 2);
    }

    #[test]
    fn events_preserve_first_seen_order() {
        let mut tree = HierarchyTree::new();
        insert(&mut tree, "Zeta/B/C/D/x.jpg", 0);
        insert(&mut tree, "Alpha/B/C/D/x.jpg", 1);
        insert(&mut tree, "Zeta/B/C/D/y.jpg", 2);

        let names: Vec<&str> = tree.events.iter().map(|e| e.name.as_str()).collect();
        assert_eq!(names, vec!["Zeta", "Alpha"]);
    }

    #[test]
    fn order_deadline_attached_at_event_creation_only() {
        let first = Utc::now();
        let mut tree = HierarchyTree::new();
        tree.insert(classify("A/B/C/D/x.jpg").unwrap(), 0, Some(first));
        // A later insert for the same event carries a different deadline; the
        // node keeps the one it was created with.
        tree.insert(
            classify("A/B/C/D/y.jpg").unwrap(),
            1,
            Some(first + chrono::Duration::days(1)),
        );

        assert_eq!(tree.events[0].order_deadline, Some(first));
    }
}

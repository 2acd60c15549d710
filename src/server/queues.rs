use std::collections::HashMap;

use crate::org_freedesktop_dbus::{NameFlag, NameReply, ReleaseNameReply};

/// One position in a service-name queue.
struct QueueEntry {
    remote: u64,
    allow_replacement: bool,
}

/// An ownership change of a single name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) struct Transition {
    pub(super) old: Option<u64>,
    pub(super) new: Option<u64>,
}

/// The service-name queues of the broker.
///
/// Each queue is an ordered list of remotes; the head is the owner.
/// Queues are created lazily on the first request and removed when they
/// become empty.
pub(super) struct ServiceQueues {
    queues: HashMap<Box<str>, Vec<QueueEntry>>,
}

impl ServiceQueues {
    pub(super) fn new() -> Self {
        Self {
            queues: HashMap::new(),
        }
    }

    /// The current owner of a name.
    pub(super) fn owner(&self, name: &str) -> Option<u64> {
        Some(self.queues.get(name)?.first()?.remote)
    }

    /// Every name with an owner.
    pub(super) fn names(&self) -> impl Iterator<Item = &str> {
        self.queues.keys().map(|name| &**name)
    }

    /// Process a `RequestName` call.
    pub(super) fn request(
        &mut self,
        remote: u64,
        name: &str,
        flags: NameFlag,
    ) -> (NameReply, Option<Transition>) {
        let allow_replacement = flags & NameFlag::ALLOW_REPLACEMENT;
        let queue = self.queues.entry(name.into()).or_default();

        if queue.is_empty() {
            queue.push(QueueEntry {
                remote,
                allow_replacement,
            });

            return (
                NameReply::PRIMARY_OWNER,
                Some(Transition {
                    old: None,
                    new: Some(remote),
                }),
            );
        }

        if queue[0].remote == remote {
            queue[0].allow_replacement = allow_replacement;
            return (NameReply::ALREADY_OWNER, None);
        }

        if flags & NameFlag::REPLACE_EXISTING && queue[0].allow_replacement {
            let old = queue[0].remote;

            // Demote the head entirely and drop any queued entry of the
            // caller before it takes the head position.
            queue.remove(0);
            queue.retain(|entry| entry.remote != remote);
            queue.insert(
                0,
                QueueEntry {
                    remote,
                    allow_replacement,
                },
            );

            return (
                NameReply::PRIMARY_OWNER,
                Some(Transition {
                    old: Some(old),
                    new: Some(remote),
                }),
            );
        }

        if !(flags & NameFlag::DO_NOT_QUEUE) {
            match queue.iter_mut().find(|entry| entry.remote == remote) {
                Some(entry) => entry.allow_replacement = allow_replacement,
                None => queue.push(QueueEntry {
                    remote,
                    allow_replacement,
                }),
            }

            return (NameReply::IN_QUEUE, None);
        }

        // The caller refuses to queue; a prior queue entry is removed as
        // well.
        queue.retain(|entry| entry.remote != remote);
        (NameReply::EXISTS, None)
    }

    /// Process a `ReleaseName` call.
    pub(super) fn release(
        &mut self,
        remote: u64,
        name: &str,
    ) -> (ReleaseNameReply, Option<Transition>) {
        let Some(queue) = self.queues.get_mut(name) else {
            return (ReleaseNameReply::NON_EXISTENT, None);
        };

        let Some(at) = queue.iter().position(|entry| entry.remote == remote) else {
            return (ReleaseNameReply::NOT_OWNER, None);
        };

        queue.remove(at);

        let transition = if at == 0 {
            let new = queue.first().map(|entry| entry.remote);

            Some(Transition {
                old: Some(remote),
                new,
            })
        } else {
            None
        };

        if queue.is_empty() {
            self.queues.remove(name);
        }

        (ReleaseNameReply::RELEASED, transition)
    }

    /// Remove a remote from every queue it appears in, typically on
    /// disconnect. Returns the resulting ownership transitions.
    pub(super) fn remove_remote(&mut self, remote: u64) -> Vec<(Box<str>, Transition)> {
        let names = self
            .queues
            .iter()
            .filter(|(_, queue)| queue.iter().any(|entry| entry.remote == remote))
            .map(|(name, _)| name.clone())
            .collect::<Vec<_>>();

        let mut transitions = Vec::new();

        for name in names {
            let (_, transition) = self.release(remote, &name);

            if let Some(transition) = transition {
                transitions.push((name, transition));
            }
        }

        transitions
    }
}

#[cfg(test)]
mod tests {
    use super::{ServiceQueues, Transition};
    use crate::org_freedesktop_dbus::{NameFlag, NameReply, ReleaseNameReply};

    #[test]
    fn first_request_owns() {
        let mut queues = ServiceQueues::new();
        let (reply, transition) = queues.request(1, "com.x", NameFlag::default());

        assert_eq!(reply, NameReply::PRIMARY_OWNER);
        assert_eq!(
            transition,
            Some(Transition {
                old: None,
                new: Some(1)
            })
        );
        assert_eq!(queues.owner("com.x"), Some(1));
    }

    #[test]
    fn owner_updates_flags() {
        let mut queues = ServiceQueues::new();
        queues.request(1, "com.x", NameFlag::default());

        let (reply, transition) = queues.request(1, "com.x", NameFlag::ALLOW_REPLACEMENT);
        assert_eq!(reply, NameReply::ALREADY_OWNER);
        assert!(transition.is_none());

        // The updated flag is observable through a replacement.
        let (reply, _) = queues.request(2, "com.x", NameFlag::REPLACE_EXISTING);
        assert_eq!(reply, NameReply::PRIMARY_OWNER);
        assert_eq!(queues.owner("com.x"), Some(2));
    }

    #[test]
    fn replacement_denied_without_allow() {
        let mut queues = ServiceQueues::new();
        queues.request(1, "com.x", NameFlag::default());

        let (reply, transition) = queues.request(2, "com.x", NameFlag::REPLACE_EXISTING);
        assert_eq!(reply, NameReply::IN_QUEUE);
        assert!(transition.is_none());
        assert_eq!(queues.owner("com.x"), Some(1));
    }

    #[test]
    fn do_not_queue_fails_and_removes_prior_entry() {
        let mut queues = ServiceQueues::new();
        queues.request(1, "com.x", NameFlag::default());
        queues.request(2, "com.x", NameFlag::default());

        let (reply, _) = queues.request(2, "com.x", NameFlag::DO_NOT_QUEUE);
        assert_eq!(reply, NameReply::EXISTS);

        // The prior queue entry is gone: releasing the owner leaves the
        // name unowned.
        let (reply, transition) = queues.release(1, "com.x");
        assert_eq!(reply, ReleaseNameReply::RELEASED);
        assert_eq!(
            transition,
            Some(Transition {
                old: Some(1),
                new: None
            })
        );
        assert_eq!(queues.owner("com.x"), None);
    }

    #[test]
    fn release_promotes_next_in_queue() {
        let mut queues = ServiceQueues::new();
        queues.request(1, "com.x", NameFlag::default());
        queues.request(2, "com.x", NameFlag::default());

        let (reply, transition) = queues.release(1, "com.x");
        assert_eq!(reply, ReleaseNameReply::RELEASED);
        assert_eq!(
            transition,
            Some(Transition {
                old: Some(1),
                new: Some(2)
            })
        );
        assert_eq!(queues.owner("com.x"), Some(2));
    }

    #[test]
    fn release_from_queue_middle_has_no_transition() {
        let mut queues = ServiceQueues::new();
        queues.request(1, "com.x", NameFlag::default());
        queues.request(2, "com.x", NameFlag::default());

        let (reply, transition) = queues.release(2, "com.x");
        assert_eq!(reply, ReleaseNameReply::RELEASED);
        assert!(transition.is_none());
    }

    #[test]
    fn release_unknown() {
        let mut queues = ServiceQueues::new();
        let (reply, _) = queues.release(1, "com.x");
        assert_eq!(reply, ReleaseNameReply::NON_EXISTENT);

        queues.request(1, "com.x", NameFlag::default());
        let (reply, _) = queues.release(2, "com.x");
        assert_eq!(reply, ReleaseNameReply::NOT_OWNER);
    }

    #[test]
    fn empty_queue_is_removed() {
        let mut queues = ServiceQueues::new();
        queues.request(1, "com.x", NameFlag::default());
        queues.release(1, "com.x");
        assert_eq!(queues.names().count(), 0);
    }

    #[test]
    fn remove_remote_releases_everything() {
        let mut queues = ServiceQueues::new();
        queues.request(1, "com.x", NameFlag::default());
        queues.request(1, "com.y", NameFlag::default());
        queues.request(2, "com.x", NameFlag::default());

        let mut transitions = queues.remove_remote(1);
        transitions.sort_by(|a, b| a.0.cmp(&b.0));

        assert_eq!(transitions.len(), 2);
        assert_eq!(&*transitions[0].0, "com.x");
        assert_eq!(transitions[0].1.new, Some(2));
        assert_eq!(&*transitions[1].0, "com.y");
        assert_eq!(transitions[1].1.new, None);

        assert_eq!(queues.owner("com.x"), Some(2));
        assert_eq!(queues.owner("com.y"), None);
    }
}

//! A tiny behavior tree: a closed set of node kinds evaluated by a single
//! function.
//!
//! Nodes hold plain function pointers so a tree is just data and can be
//! built once and reused for every tick.

/// Result of evaluating a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Success,
    Failure,
}

impl Status {
    fn from_bool(ok: bool) -> Self {
        if ok { Status::Success } else { Status::Failure }
    }
}

pub enum Node<C> {
    /// Succeeds when the predicate holds.
    Condition {
        name: &'static str,
        check: fn(&C) -> bool,
    },
    /// Runs an effect. Succeeds when the effect reports it took hold.
    Action {
        name: &'static str,
        run: fn(&mut C) -> bool,
    },
    /// First child to succeed wins; fails if none do.
    Selector {
        name: &'static str,
        children: Vec<Node<C>>,
    },
    /// Succeeds only if every child succeeds, stopping at the first failure.
    Sequence {
        name: &'static str,
        children: Vec<Node<C>>,
    },
}

impl<C> Node<C> {
    pub fn condition(name: &'static str, check: fn(&C) -> bool) -> Self {
        Node::Condition { name, check }
    }

    pub fn action(name: &'static str, run: fn(&mut C) -> bool) -> Self {
        Node::Action { name, run }
    }

    pub fn selector(name: &'static str, children: Vec<Node<C>>) -> Self {
        Node::Selector { name, children }
    }

    pub fn sequence(name: &'static str, children: Vec<Node<C>>) -> Self {
        Node::Sequence { name, children }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Node::Condition { name, .. }
            | Node::Action { name, .. }
            | Node::Selector { name, .. }
            | Node::Sequence { name, .. } => name,
        }
    }
}

/// Evaluate `node` against `ctx`.
pub fn tick<C>(node: &Node<C>, ctx: &mut C) -> Status {
    match node {
        Node::Condition { check, .. } => Status::from_bool(check(ctx)),
        Node::Action { run, .. } => Status::from_bool(run(ctx)),
        Node::Selector { children, .. } => {
            for child in children {
                if tick(child, ctx) == Status::Success {
                    return Status::Success;
                }
            }
            Status::Failure
        }
        Node::Sequence { children, .. } => {
            for child in children {
                if tick(child, ctx) == Status::Failure {
                    return Status::Failure;
                }
            }
            Status::Success
        }
    }
}

//! Button dispatch registry.
//!
//! Several control schemes share one physical controller. Each of them registers its actions
//! under its own [`OwnerTag`], so that loading or unloading one scheme never disturbs the
//! bindings of another. Exactly one action exists per (button, phase, owner) triple.
//!
//! Actions receive the registry itself together with the dispatch context, so an action may
//! bind or unbind other actions while a dispatch is in progress. Dispatch works over a
//! snapshot of the actions taken when the call starts: changes made by an action take effect
//! from the next dispatch call.
//!
//! ```
//! use rs_teleop_control::buttons::{Button, ButtonPhase};
//! use rs_teleop_control::dispatch::{action, ButtonRegistry, OwnerTag};
//!
//! let mut registry: ButtonRegistry<u32> = ButtonRegistry::new();
//! registry.bind(Button::Grip, ButtonPhase::Click, OwnerTag::ClutchControl,
//!     action(|_, clicks: &mut u32| *clicks += 1));
//! let mut clicks = 0;
//! registry.dispatch(Button::Grip, ButtonPhase::Click, &mut clicks);
//! assert_eq!(clicks, 1);
//! ```

use std::fmt;
use std::rc::Rc;

use tracing::trace;

use crate::buttons::{Button, ButtonPhase};

/// Identifies the scheme that owns a binding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OwnerTag {
    ClutchControl,
    DragControl,
    OffsetControl,
    RedirectedControl,
    Grasping,
}

impl fmt::Display for OwnerTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            OwnerTag::ClutchControl => "Clutch Control",
            OwnerTag::DragControl => "Drag Control",
            OwnerTag::OffsetControl => "Offset Control",
            OwnerTag::RedirectedControl => "Redirected Control",
            OwnerTag::Grasping => "Grasping",
        };
        write!(f, "{}", name)
    }
}

/// Callback bound to a button event. Gets the registry (to rebind) and the context.
pub type Action<C> = Rc<dyn Fn(&mut ButtonRegistry<C>, &mut C)>;

/// Wraps a closure into an [`Action`].
pub fn action<C, F>(f: F) -> Action<C>
where
    F: Fn(&mut ButtonRegistry<C>, &mut C) + 'static,
{
    Rc::new(f)
}

struct Binding<C> {
    button: Button,
    phase: ButtonPhase,
    owner: OwnerTag,
    action: Action<C>,
}

/// Maps (button, phase, owner) to actions, preserving registration order.
pub struct ButtonRegistry<C> {
    bindings: Vec<Binding<C>>,
}

impl<C> Default for ButtonRegistry<C> {
    fn default() -> Self {
        ButtonRegistry { bindings: Vec::new() }
    }
}

impl<C> ButtonRegistry<C> {
    pub fn new() -> Self {
        ButtonRegistry::default()
    }

    /// Register the action, replacing the previous action for the same triple. A replaced
    /// action keeps its position in the dispatch order.
    pub fn bind(&mut self, button: Button, phase: ButtonPhase, owner: OwnerTag, action: Action<C>) {
        match self.position(button, phase, owner) {
            Some(idx) => self.bindings[idx].action = action,
            None => self.bindings.push(Binding {
                button,
                phase,
                owner,
                action,
            }),
        }
        trace!("bound {button}/{phase:?} for {owner}");
    }

    /// Remove the action. Unbinding something never bound is not an error.
    pub fn unbind(&mut self, button: Button, phase: ButtonPhase, owner: OwnerTag) {
        if let Some(idx) = self.position(button, phase, owner) {
            self.bindings.remove(idx);
            trace!("unbound {button}/{phase:?} for {owner}");
        }
    }

    /// Remove every action registered by the owner.
    pub fn unbind_owner(&mut self, owner: OwnerTag) {
        self.bindings.retain(|b| b.owner != owner);
    }

    pub fn is_bound(&self, button: Button, phase: ButtonPhase, owner: OwnerTag) -> bool {
        self.position(button, phase, owner).is_some()
    }

    /// Number of bindings held by the owner.
    pub fn count_owned(&self, owner: OwnerTag) -> usize {
        self.bindings.iter().filter(|b| b.owner == owner).count()
    }

    /// Invoke every action bound to (button, phase), across all owners, in registration order.
    /// Returns the number of actions invoked.
    pub fn dispatch(&mut self, button: Button, phase: ButtonPhase, context: &mut C) -> usize {
        let snapshot: Vec<Action<C>> = self
            .bindings
            .iter()
            .filter(|b| b.button == button && b.phase == phase)
            .map(|b| Rc::clone(&b.action))
            .collect();
        for act in &snapshot {
            act(self, context);
        }
        snapshot.len()
    }

    fn position(&self, button: Button, phase: ButtonPhase, owner: OwnerTag) -> Option<usize> {
        self.bindings
            .iter()
            .position(|b| b.button == button && b.phase == phase && b.owner == owner)
    }
}

use std::{fmt, str::FromStr};

use dna::Dna;
use nalgebra::Vector3;

use crate::{Error, Result};

/// An edit to a [Dna].
///
/// Commands run in place; an error may leave the model partially edited, so callers that need
/// all-or-nothing semantics should use [Command::apply] on a clone.
pub trait Command: fmt::Debug {
    fn run(&self, dna: &mut Dna) -> Result<()>;

    /// Run on an owned model, returning the edited model.
    fn apply(&self, mut dna: Dna) -> Result<Dna> {
        self.run(&mut dna)?;
        Ok(dna)
    }

    /// Short type name, used in logs and errors.
    fn name(&self) -> &'static str {
        let full = std::any::type_name::<Self>();
        let path = full.split('<').next().unwrap_or(full);
        path.rsplit("::").next().unwrap_or(path)
    }
}

impl<C: Command + ?Sized> Command for Box<C> {
    #[inline]
    fn run(&self, dna: &mut Dna) -> Result<()> {
        (**self).run(dna)
    }

    #[inline]
    fn name(&self) -> &'static str {
        (**self).name()
    }
}

/// Commands applied strictly in order to one working copy.
///
/// Later commands see the index shifts made by earlier ones, so order matters. The first failure
/// stops the sequence, leaving the earlier commands applied.
#[derive(Debug, Default)]
pub struct CommandSequence {
    commands: Vec<Box<dyn Command>>,
}

impl CommandSequence {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command.
    pub fn add(&mut self, command: impl Command + 'static) -> &mut Self {
        self.commands.push(Box::new(command));
        self
    }

    pub fn with(mut self, command: impl Command + 'static) -> Self {
        self.add(command);
        self
    }

    /// Remove the command at `index`, if any.
    pub fn remove(&mut self, index: usize) -> Option<Box<dyn Command>> {
        (index < self.commands.len()).then(|| self.commands.remove(index))
    }

    /// Whether `command` is one of this sequence's own commands (by identity, not equality).
    pub fn contains(&self, command: &dyn Command) -> bool {
        self.commands
            .iter()
            .any(|c| std::ptr::addr_eq(c.as_ref() as *const dyn Command, command))
    }

    #[inline]
    pub fn get(&self, index: usize) -> Option<&dyn Command> {
        self.commands.get(index).map(Box::as_ref)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &dyn Command> + '_ {
        self.commands.iter().map(Box::as_ref)
    }
}

impl Command for CommandSequence {
    /// # Errors
    /// * [Error::Sequence] wrapping the first failure, with the failing command's position
    fn run(&self, dna: &mut Dna) -> Result<()> {
        for (index, command) in self.commands.iter().enumerate() {
            let _span = tracing::info_span!("command", index, name = command.name()).entered();
            tracing::debug!(?command, "running");
            command.run(dna).map_err(|e| {
                tracing::warn!(error = %e, "command failed");
                Error::Sequence {
                    index,
                    command: command.name(),
                    source: Box::new(e),
                }
            })?;
        }
        Ok(())
    }
}

/// Runs `command` only if `predicate` holds for it and the model at the time of running.
pub struct ConditionalCommand<C, P> {
    command: C,
    predicate: P,
}

impl<C, P> ConditionalCommand<C, P>
where
    C: Command,
    P: Fn(&C, &Dna) -> bool,
{
    pub fn new(command: C, predicate: P) -> Self {
        Self { command, predicate }
    }

    #[inline]
    pub fn command(&self) -> &C {
        &self.command
    }
}

impl<C: fmt::Debug, P> fmt::Debug for ConditionalCommand<C, P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConditionalCommand")
            .field("command", &self.command)
            .finish_non_exhaustive()
    }
}

impl<C, P> Command for ConditionalCommand<C, P>
where
    C: Command,
    P: Fn(&C, &Dna) -> bool,
{
    fn run(&self, dna: &mut Dna) -> Result<()> {
        if (self.predicate)(&self.command, dna) {
            self.command.run(dna)
        } else {
            tracing::trace!(command = self.command.name(), "condition not met; skipping");
            Ok(())
        }
    }
}

/// How a vector argument combines with existing values, weighted per element by a mask.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Default)]
pub enum VectorOperation {
    /// `lerp(p, v, w)`
    #[default]
    Interpolate,
    /// `p + w·v`
    Add,
    /// `p - w·v`
    Subtract,
    /// `p ⊙ (w·v)`, component-wise
    Multiply,
}

impl VectorOperation {
    pub fn apply(self, p: Vector3<f32>, v: Vector3<f32>, weight: f32) -> Vector3<f32> {
        match self {
            VectorOperation::Interpolate => p * (1.0 - weight) + v * weight,
            VectorOperation::Add => p + v * weight,
            VectorOperation::Subtract => p - v * weight,
            VectorOperation::Multiply => p.component_mul(&(v * weight)),
        }
    }
}

impl fmt::Display for VectorOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VectorOperation::Interpolate => "interpolate",
            VectorOperation::Add => "add",
            VectorOperation::Subtract => "subtract",
            VectorOperation::Multiply => "multiply",
        })
    }
}

impl FromStr for VectorOperation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "interpolate" => Ok(VectorOperation::Interpolate),
            "add" => Ok(VectorOperation::Add),
            "subtract" => Ok(VectorOperation::Subtract),
            "multiply" => Ok(VectorOperation::Multiply),
            _ => Err(Error::invalid(format!("unknown vector operation: {s:?}"))),
        }
    }
}

/// Per-element weights for `len` elements: 1 everywhere if `mask` is empty.
///
/// # Errors
/// * [InvalidOperation](dna::Error::InvalidOperation) if `mask` is non-empty and not `len` long
pub(crate) fn mask_weights(mask: &[f32], len: usize) -> Result<impl Fn(usize) -> f32 + '_> {
    if !mask.is_empty() && mask.len() != len {
        return Err(Error::invalid(format!(
            "mask has {} weights for {len} elements",
            mask.len()
        )));
    }
    Ok(move |i: usize| mask.get(i).copied().unwrap_or(1.0))
}

#[cfg(test)]
mod test {
    use super::*;
    use dna::{fixture, JointIndex};

    #[derive(Debug)]
    struct Fail;

    impl Command for Fail {
        fn run(&self, _: &mut Dna) -> Result<()> {
            Err(Error::invalid("always fails"))
        }
    }

    #[derive(Debug)]
    struct RenameRoot(&'static str);

    impl Command for RenameRoot {
        fn run(&self, dna: &mut Dna) -> Result<()> {
            dna.try_definition_mut()?.joint_names[0] = self.0.into();
            Ok(())
        }
    }

    #[test]
    fn sequence_short_circuits() {
        let mut seq = CommandSequence::new();
        seq.add(RenameRoot("a")).add(Fail).add(RenameRoot("b"));
        assert_eq!(seq.len(), 3);

        let mut rig = fixture::rig();
        let err = seq.run(&mut rig).unwrap_err();
        assert!(matches!(
            err,
            Error::Sequence {
                index: 1,
                command: "Fail",
                ..
            }
        ));
        assert!(matches!(err.root(), dna::Error::InvalidOperation(_)));
        // no rollback
        assert_eq!(rig.joint_name(JointIndex(0)).ok(), Some("a"));
    }

    #[test]
    fn sequence_management() {
        let mut seq = CommandSequence::new().with(RenameRoot("a")).with(Fail);
        let outsider = RenameRoot("a");
        assert!(!seq.contains(&outsider));
        let first = seq.get(0).unwrap();
        assert!(seq.contains(first));
        assert_eq!(first.name(), "RenameRoot");

        assert!(seq.remove(1).is_some());
        assert!(seq.remove(1).is_none());
        assert_eq!(seq.len(), 1);
        assert_eq!(seq.apply(fixture::rig()).unwrap().joint_name(JointIndex(0)).ok(), Some("a"));
    }

    #[test]
    fn conditional() {
        let skip = ConditionalCommand::new(RenameRoot("x"), |_, dna: &Dna| {
            dna.joint_count().is_ok_and(|n| n > 100)
        });
        let dna = skip.apply(fixture::rig()).unwrap();
        assert_eq!(dna.joint_name(JointIndex(0)).ok(), Some("spine"));

        let run = ConditionalCommand::new(RenameRoot("x"), |c: &RenameRoot, _: &Dna| c.0 == "x");
        let dna = run.apply(dna).unwrap();
        assert_eq!(dna.joint_name(JointIndex(0)).ok(), Some("x"));
    }

    #[test]
    fn operations() {
        let p = Vector3::new(1.0, 2.0, 3.0);
        let v = Vector3::new(3.0, 2.0, 1.0);
        assert_eq!(VectorOperation::Add.apply(p, v, 0.5), Vector3::new(2.5, 3.0, 3.5));
        assert_eq!(VectorOperation::Subtract.apply(p, v, 1.0), Vector3::new(-2.0, 0.0, 2.0));
        assert_eq!(VectorOperation::Interpolate.apply(p, v, 0.5), Vector3::new(2.0, 2.0, 2.0));
        assert_eq!(VectorOperation::Multiply.apply(p, v, 1.0), Vector3::new(3.0, 4.0, 3.0));

        assert_eq!("Add".parse::<VectorOperation>().ok(), Some(VectorOperation::Add));
        assert!(matches!(
            "divide".parse::<VectorOperation>().map_err(|e| e.root().to_string()),
            Err(msg) if msg.contains("divide")
        ));
    }

    #[test]
    fn masks() {
        let ones = mask_weights(&[], 3).unwrap();
        assert_eq!((0..3).map(&ones).collect::<Vec<_>>(), vec![1.0; 3]);
        let given = mask_weights(&[0.5, 0.25], 2).unwrap();
        assert_eq!((0..2).map(&given).collect::<Vec<_>>(), vec![0.5, 0.25]);
        assert!(mask_weights(&[0.5], 2).is_err());
    }
}

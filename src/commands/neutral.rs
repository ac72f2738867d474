use dna::{Dna, JointIndex, TypedIndex};
use nalgebra::Vector3;

use crate::{Command, Error, Result};

fn replace_all(
    dna: &mut Dna,
    values: &[Vector3<f32>],
    table: impl FnOnce(&mut dna::Definition) -> &mut Vec<Vector3<f32>>,
) -> Result<()> {
    let def = dna.try_definition_mut()?;
    let joints = def.joint_count();
    if values.len() != joints {
        return Err(Error::out_of_range(JointIndex::KIND, values.len(), joints));
    }
    *table(def) = values.to_vec();
    Ok(())
}

/// Overwrite every joint's neutral (parent-relative) translation.
#[derive(Debug, Clone, PartialEq)]
pub struct SetNeutralJointTranslationsCommand {
    pub translations: Vec<Vector3<f32>>,
}

impl SetNeutralJointTranslationsCommand {
    pub fn new(translations: Vec<Vector3<f32>>) -> Self {
        Self { translations }
    }
}

impl Command for SetNeutralJointTranslationsCommand {
    /// # Errors
    /// * [IndexOutOfRange](dna::Error::IndexOutOfRange) unless there's exactly one translation per
    ///   joint
    fn run(&self, dna: &mut Dna) -> Result<()> {
        replace_all(dna, &self.translations, |def| {
            &mut def.neutral_joint_translations
        })
    }
}

/// Overwrite every joint's neutral rotation, in the model's rotation unit.
#[derive(Debug, Clone, PartialEq)]
pub struct SetNeutralJointRotationsCommand {
    pub rotations: Vec<Vector3<f32>>,
}

impl SetNeutralJointRotationsCommand {
    pub fn new(rotations: Vec<Vector3<f32>>) -> Self {
        Self { rotations }
    }
}

impl Command for SetNeutralJointRotationsCommand {
    /// # Errors
    /// * [IndexOutOfRange](dna::Error::IndexOutOfRange) unless there's exactly one rotation per
    ///   joint
    fn run(&self, dna: &mut Dna) -> Result<()> {
        replace_all(dna, &self.rotations, |def| &mut def.neutral_joint_rotations)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use dna::fixture;

    #[test]
    fn bulk_overwrite() {
        let ones = vec![Vector3::repeat(1.0); 5];
        let rig = SetNeutralJointTranslationsCommand::new(ones.clone())
            .apply(fixture::rig())
            .unwrap();
        let rig = SetNeutralJointRotationsCommand::new(ones.clone())
            .apply(rig)
            .unwrap();
        let def = rig.definition().unwrap();
        assert_eq!(def.neutral_joint_translations, ones);
        assert_eq!(def.neutral_joint_rotations, ones);
    }

    #[test]
    fn wrong_length() {
        let mut rig = fixture::rig();
        let err = SetNeutralJointRotationsCommand::new(vec![Vector3::zeros(); 6])
            .run(&mut rig)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Dna(dna::Error::IndexOutOfRange(e)) if e.index == 6 && e.len == 5
        ));
        assert_eq!(rig, fixture::rig());
    }
}

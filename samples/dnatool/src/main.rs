use std::{
    io::{self, Write},
    path::Path,
    process::ExitCode,
};

use clap::Parser;
use dna::{DataLayer, Dna, EntityKind, JointIndex, Writer};
use dnacalib::{Command, RemoveJointCommand, RenameCommand, ScaleCommand, SetLodsCommand};

use crate::cli::{Cli, Subcommand};

mod cli;

#[derive(Debug, thiserror::Error)]
enum Error {
    #[error(transparent)]
    Edit(#[from] dnacalib::Error),
    #[error("couldn't write output: {0}")]
    Io(#[from] io::Error),
}

impl From<dna::Error> for Error {
    #[inline]
    fn from(e: dna::Error) -> Self {
        Self::Edit(e.into())
    }
}

fn inspect(dna: &Dna, out: &mut impl Write) -> io::Result<()> {
    if let Some(desc) = dna.descriptor() {
        writeln!(out, "name:        {}", desc.name)?;
        writeln!(out, "archetype:   {:?}", desc.archetype)?;
        writeln!(out, "gender:      {:?}", desc.gender)?;
        writeln!(out, "age:         {}", desc.age)?;
        writeln!(out, "units:       {:?}, {:?}", desc.translation_unit, desc.rotation_unit)?;
        writeln!(out, "lods:        {} (max {})", desc.lod_count, desc.max_lod)?;
        for (key, value) in desc.metadata.iter() {
            writeln!(out, "metadata:    {key} = {value}")?;
        }
    }
    if let Some(def) = dna.definition() {
        writeln!(out, "joints:      {}", def.joint_count())?;
        writeln!(out, "meshes:      {}", def.mesh_count())?;
        writeln!(out, "channels:    {}", def.blend_shape_channel_count())?;
        writeln!(out, "maps:        {}", def.animated_map_count())?;
    }
    if let Some(geometry) = dna.geometry() {
        let vertices: usize = geometry.meshes.iter().map(|m| m.vertex_count()).sum();
        writeln!(out, "vertices:    {vertices}")?;
    }
    if let Some(blend_shapes) = dna.blend_shapes() {
        let targets: usize = blend_shapes.targets.iter().map(Vec::len).sum();
        writeln!(out, "targets:     {targets}")?;
    }
    Ok(())
}

/// Load every layer of `file`, run `command` on it, and write the result to `output`.
fn edit(file: &Path, command: impl Command, output: &Path) -> Result<(), Error> {
    let dna = dna::load(file, DataLayer::All)?;
    tracing::debug!(?command, "editing");
    let dna = command.apply(dna)?;
    dna.validate()?;
    Writer::new().set_from(&dna).write(output)?;
    tracing::info!(?output, layers = ?dna.loaded(), "wrote edited container");
    Ok(())
}

fn run(command: Subcommand) -> Result<(), Error> {
    match command {
        Subcommand::Inspect { file, layer } => {
            let dna = dna::load(&file, layer)?;
            inspect(&dna, &mut io::stdout().lock())?;
        }
        Subcommand::ToJson { file, layer } => {
            let dna = dna::load(&file, layer)?;
            let mut out = io::stdout().lock();
            dna::ser::json::to_writer(&mut out, &dna, layer)?;
            writeln!(out)?;
        }
        Subcommand::RenameJoint {
            file,
            target,
            name,
            output,
        } => edit(
            &file,
            RenameCommand::new(EntityKind::Joint, target, name),
            &output.path,
        )?,
        Subcommand::RemoveJoint {
            file,
            index,
            output,
        } => edit(&file, RemoveJointCommand::new(JointIndex(index)), &output.path)?,
        Subcommand::Scale {
            file,
            factor,
            origin,
            output,
        } => edit(&file, ScaleCommand::new(factor, origin), &output.path)?,
        Subcommand::SetLods { file, lods, output } => {
            edit(&file, SetLodsCommand::new(lods), &output.path)?
        }
    }
    Ok(())
}

pub fn main() -> ExitCode {
    let cli = Cli::parse();
    cli::initialize_tracing(&cli.log_filter, cli.log_format);

    match run(cli.command) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!(error = %e, source = ?std::error::Error::source(&e), "failed");
            ExitCode::FAILURE
        }
    }
}

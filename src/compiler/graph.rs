//! Dependency resolution and bubbling
//!
//! Every file's transitive `@require` list is computed once and memoized in
//! `FileData::requires`. Master and parent bubbling then rewrite those lists so
//! dependencies shared by several files are supplied once, by the file that
//! aggregates them.

use crate::compiler::Project;
use crate::core::constants::BUBBLE_THRESHOLD;
use crate::core::FileId;
use crate::error::{CompilerError, Result};
use std::collections::HashSet;

/// Ordered transitive requires of `file`: each dependency appears after its
/// own dependencies, duplicates keep their first position and the file
/// itself is never listed.
pub fn get_requires(project: &mut Project, file: FileId) -> Result<Vec<FileId>> {
    let mut in_progress = Vec::new();
    requires_of(project, file, &mut in_progress)
}

fn requires_of(project: &mut Project, file: FileId, in_progress: &mut Vec<FileId>) -> Result<Vec<FileId>> {
    if let Some(requires) = &project.file(file).data.requires {
        return Ok(requires.clone());
    }
    if in_progress.contains(&file) {
        return Err(cycle_error(project, in_progress, file));
    }

    let targets = project.resolve_directive_targets(file, "require")?;
    in_progress.push(file);
    let mut requires = Vec::new();
    for target in targets {
        if target == file {
            continue;
        }
        requires.extend(requires_of(project, target, in_progress)?);
        requires.push(target);
    }
    in_progress.pop();

    let mut seen = HashSet::new();
    requires.retain(|id| *id != file && seen.insert(*id));

    log::trace!("{} requires {} files", project.file(file).path, requires.len());
    project.file_mut(file).data.requires = Some(requires.clone());
    Ok(requires)
}

fn current_requires(project: &Project, file: FileId) -> Vec<FileId> {
    project.file(file).data.requires.clone().unwrap_or_default()
}

fn cycle_error(project: &Project, in_progress: &[FileId], repeated: FileId) -> CompilerError {
    let start = in_progress.iter().position(|id| *id == repeated).unwrap_or(0);
    let chain = in_progress[start..]
        .iter()
        .chain(std::iter::once(&repeated))
        .map(|id| project.file(*id).path.as_str())
        .collect::<Vec<_>>()
        .join(" -> ");
    CompilerError::CircularDependency {
        file: project.file(repeated).path.clone(),
        chain,
    }
}

/// Lift the requires common to every `@master` source of `file` into `file`
/// and strip the master's requires from each source. Sources are bubbled
/// first, so nested master relationships compose.
pub fn bubble_master(project: &mut Project, file: FileId) -> Result<()> {
    let mut in_progress = Vec::new();
    bubble_master_inner(project, file, &mut in_progress)
}

fn bubble_master_inner(project: &mut Project, file: FileId, in_progress: &mut Vec<FileId>) -> Result<()> {
    if project.file(file).data.masters_bubbled {
        return Ok(());
    }
    if in_progress.contains(&file) {
        return Err(cycle_error(project, in_progress, file));
    }

    let mut sources = project.resolve_directive_targets(file, "master")?;
    sources.retain(|source| *source != file);
    if sources.is_empty() {
        project.file_mut(file).data.masters_bubbled = true;
        return Ok(());
    }

    in_progress.push(file);
    for source in &sources {
        bubble_master_inner(project, *source, in_progress)?;
    }
    in_progress.pop();

    let lists: Vec<Vec<FileId>> = sources.iter().map(|s| current_requires(project, *s)).collect();
    let common: Vec<FileId> = lists[0]
        .iter()
        .filter(|id| lists[1..].iter().all(|list| list.contains(id)))
        .copied()
        .collect();

    let mut requires = current_requires(project, file);
    for id in common {
        if id != file && !requires.contains(&id) {
            requires.push(id);
        }
    }

    for source in &sources {
        if let Some(list) = project.file_mut(*source).data.requires.as_mut() {
            list.retain(|id| !requires.contains(id));
        }
    }

    log::debug!(
        "@master {} now supplies {} shared files",
        project.file(file).path,
        requires.len()
    );
    let data = &mut project.file_mut(file).data;
    data.requires = Some(requires);
    data.masters_bubbled = true;
    Ok(())
}

/// Bubble requires shared by at least two descendants of every `@parent`
/// target into that parent, deepest parents first.
pub fn bubble_parents(project: &mut Project) -> Result<()> {
    for id in project.file_ids() {
        let mut in_progress = Vec::new();
        bubble_parent(project, id, &mut in_progress)?;
    }
    Ok(())
}

fn bubble_parent(project: &mut Project, file: FileId, in_progress: &mut Vec<FileId>) -> Result<()> {
    let children = project.file(file).data.children.clone();
    if children.is_empty() || project.file(file).data.parent_bubbled {
        return Ok(());
    }
    if in_progress.contains(&file) {
        return Err(cycle_error(project, in_progress, file));
    }

    in_progress.push(file);
    for child in &children {
        bubble_parent(project, *child, in_progress)?;
    }
    in_progress.pop();

    // Counts keep first-seen order so the lifted block is deterministic.
    let mut counts: Vec<(FileId, usize)> = Vec::new();
    count_descendant_requires(project, file, &mut counts);

    let mut requires = current_requires(project, file);
    for (id, count) in counts {
        if count >= BUBBLE_THRESHOLD && id != file && !requires.contains(&id) {
            requires.push(id);
        }
    }

    strip_descendants(project, file, &requires);

    let data = &mut project.file_mut(file).data;
    data.requires = Some(requires);
    data.parent_bubbled = true;
    Ok(())
}

fn count_descendant_requires(project: &Project, file: FileId, counts: &mut Vec<(FileId, usize)>) {
    for child in &project.file(file).data.children {
        count_descendant_requires(project, *child, counts);
        for id in project.file(*child).data.requires.iter().flatten() {
            match counts.iter_mut().find(|(seen, _)| seen == id) {
                Some((_, count)) => *count += 1,
                None => counts.push((*id, 1)),
            }
        }
    }
}

fn strip_descendants(project: &mut Project, file: FileId, removes: &[FileId]) {
    let children = project.file(file).data.children.clone();
    for child in children {
        if let Some(list) = project.file_mut(child).data.requires.as_mut() {
            list.retain(|id| !removes.contains(id));
        }
        strip_descendants(project, child, removes);
    }
}

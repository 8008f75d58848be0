//! CLI command implementations.

use crate::manifest::{load_manager, Component};
use colored::Colorize;
use keyweave_keys::{KeyManager, NamedElements};
use std::fs;
use std::path::Path;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Show every group and component in a manifest.
pub fn inspect(manifest: &Path, json: bool) -> Result<()> {
    let manager = load_manager(manifest)?;

    if json {
        let mut groups = serde_json::Map::new();
        for id in manager.groups() {
            let members: Vec<&Component> = manager.group(id)?.into_values().collect();
            groups.insert(id.to_string(), serde_json::to_value(members)?);
        }
        let output = serde_json::json!({
            "stats": manager.graph().stats(),
            "groups": groups,
            "components": manager.iter().collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&output)?);
        return Ok(());
    }

    let stats = manager.graph().stats();
    println!(
        "{} {} groups, {} components, {} names, {} associations\n",
        "✓".green(),
        stats.top_keys.to_string().cyan(),
        stats.elements.to_string().cyan(),
        stats.bottom_keys.to_string().cyan(),
        stats.edges
    );

    for id in manager.groups() {
        println!("{}", id.yellow().bold());
        for component in manager.group(id)?.values() {
            print_component(component);
        }
    }

    Ok(())
}

/// Show the members of one group.
pub fn group(manifest: &Path, id: &str, json: bool) -> Result<()> {
    let manager = load_manager(manifest)?;
    let members = manager.group(id)?;
    print_named(&members, json, &format!("Group {}", id))
}

/// Show every component filed under any of the given names.
pub fn find(manifest: &Path, names: &[String], json: bool) -> Result<()> {
    let manager = load_manager(manifest)?;
    let found = manager.by_names(names)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&found)?);
        return Ok(());
    }

    if found.is_empty() {
        println!("No components named {}", names.join(", "));
        return Ok(());
    }

    println!("Found {} components:\n", found.len());
    for component in found {
        let groups = manager.groups_of(component)?;
        print_component(component);
        println!(
            "      {}",
            format!(
                "in {}",
                groups
                    .iter()
                    .map(|id| id.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )
            .dimmed()
        );
    }

    Ok(())
}

/// Show the components sharing a name with one member of a group.
pub fn siblings(manifest: &Path, id: &str, name: &str, json: bool) -> Result<()> {
    let manager = load_manager(manifest)?;
    let component = member(&manager, id, name)?;
    let siblings = manager.siblings(component)?;
    print_named(&siblings, json, &format!("Siblings of {} in {}", name, id))
}

/// Export components and associations to a JSON file.
pub fn export(manifest: &Path, output: &Path) -> Result<()> {
    let manager = load_manager(manifest)?;
    let graph = manager.graph();

    let export = serde_json::json!({
        "version": "1.0",
        "stats": graph.stats(),
        "components": manager.iter().collect::<Vec<_>>(),
        "associations": graph.export_associations(),
    });

    fs::write(output, serde_json::to_string_pretty(&export)?)?;
    println!("{} Exported to {}", "✓".green(), output.display());

    Ok(())
}

fn member<'a>(manager: &'a KeyManager<Component>, id: &str, name: &str) -> Result<&'a Component> {
    manager
        .group(id)?
        .get(name)
        .copied()
        .ok_or_else(|| format!("no component named '{}' in group {}", name, id).into())
}

fn print_named(elements: &NamedElements<'_, Component>, json: bool, title: &str) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(elements)?);
        return Ok(());
    }

    println!("{} ({} components)\n", title.cyan(), elements.len());
    for component in elements.values() {
        print_component(component);
    }
    Ok(())
}

fn print_component(component: &Component) {
    if component.props.is_empty() {
        println!("  {}", component.name.cyan());
    } else {
        let props = serde_json::Value::Object(component.props.clone());
        println!("  {} {}", component.name.cyan(), props.to_string().dimmed());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write_manifest(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("scene.json");
        fs::write(
            &path,
            r#"{ "groups": [
                [{ "name": "mover", "speed": 1 }, { "name": "renderer" }],
                [{ "name": "mover", "speed": 2 }]
            ] }"#,
        )
        .unwrap();
        path
    }

    #[test]
    fn test_export_writes_associations() {
        let dir = tempdir().unwrap();
        let manifest = write_manifest(dir.path());
        let output = dir.path().join("out.json");

        export(&manifest, &output).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&output).unwrap()).unwrap();
        assert_eq!(written["stats"]["elements"], 3);
        assert_eq!(written["components"].as_array().unwrap().len(), 3);
        assert_eq!(written["associations"].as_array().unwrap().len(), 6);
        assert_eq!(written["associations"][0]["namespace"], "top");
        assert_eq!(written["associations"][0]["key"], "g1");
    }

    #[test]
    fn test_member_lookup() {
        let dir = tempdir().unwrap();
        let manager = load_manager(&write_manifest(dir.path())).unwrap();

        assert_eq!(member(&manager, "g2", "mover").unwrap().props["speed"], 2);
        assert!(member(&manager, "g2", "renderer").is_err());
        assert!(member(&manager, "g9", "mover").is_err());
    }

    #[test]
    fn test_query_commands_succeed() {
        let dir = tempdir().unwrap();
        let manifest = write_manifest(dir.path());

        inspect(&manifest, true).unwrap();
        group(&manifest, "g1", false).unwrap();
        find(&manifest, &["mover".to_string()], false).unwrap();
        siblings(&manifest, "g1", "mover", true).unwrap();
        assert!(find(&manifest, &["ghost".to_string()], false).is_err());
    }
}

//! Dotted-path navigation over the abstract `Path` seam (spec §6.2).

use filterql_core::query_builder::Path;

/// Navigate `root` through each `.`-separated segment of `dotted`, nesting
/// `Path::get` once per segment — the same convention
/// `filterql_condition::resolver` uses for atom field names, re-grounded
/// here since the engine's select lists and join predicates need the same
/// navigation over computed-field dependency paths and projection aliases.
pub fn nested_path(root: &dyn Path, dotted: &str) -> Box<dyn Path> {
    let mut segments = dotted.split('.');
    let mut path = root.get(segments.next().unwrap_or(dotted));
    for segment in segments {
        path = path.get(segment);
    }
    path
}

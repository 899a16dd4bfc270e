use ratebook_navigator::NavigationSnapshot;
use ratebook_protocol::{CatalogConfig, ResourceLine, ResourceReference, SectionNode, WorkDetails};
use ratebook_search::{SearchState, SuggestionState, PATH_SEPARATOR};

pub fn render_databases(config: &CatalogConfig) -> String {
    let default = config.default_database.as_deref();
    let mut out = String::new();
    for db in &config.databases {
        let marker = if Some(db.id.as_str()) == default { "*" } else { " " };
        out.push_str(&format!("{marker} {:<12} {}\n", db.id, db.name));
        if !db.description.is_empty() {
            out.push_str(&format!("  {:<12} {}\n", "", db.description));
        }
    }
    out
}

pub fn render_tree(snapshot: &NavigationSnapshot) -> String {
    let mut out = String::new();
    if let Some(db) = &snapshot.current_database {
        out.push_str(&format!("[{db}]\n"));
    }
    for node in snapshot.sections.iter() {
        render_node(&mut out, snapshot, node, 0);
    }
    out
}

fn render_node(out: &mut String, snapshot: &NavigationSnapshot, node: &SectionNode, level: usize) {
    let expanded = snapshot.is_expanded(&node.code);
    let marker = match (node.has_children, expanded) {
        (_, true) => '-',
        (true, false) => '+',
        (false, false) => ' ',
    };
    let indent = "  ".repeat(level);
    out.push_str(&format!("{indent}{marker} {} {}\n", node.code, node.name));
    if !expanded {
        return;
    }
    for child in &node.children {
        render_node(out, snapshot, child, level + 1);
    }
    for work in &node.works {
        out.push_str(&format!(
            "{indent}    * {} {} ({})\n",
            work.code, work.name, work.measure_unit
        ));
    }
}

pub fn render_work(work: &WorkDetails) -> String {
    let mut out = format!("{} {}\n", work.code, work.name);
    if !work.end_name.is_empty() {
        out.push_str(&format!("  {}\n", work.end_name));
    }
    out.push_str(&format!("Unit: {}\n", work.measure_unit));
    if !work.section_names.is_empty() {
        out.push_str(&format!("Path: {}\n", work.section_names.join(PATH_SEPARATOR)));
    }
    if !work.content.is_empty() {
        out.push_str("Content:\n");
        for line in &work.content {
            out.push_str(&format!("  - {line}\n"));
        }
    }
    if !work.resources.is_empty() {
        out.push_str("Resources:\n");
        for resource in &work.resources {
            out.push_str(&render_resource_line(resource));
        }
    }
    if !work.references.is_empty() {
        let refs: Vec<String> = work
            .references
            .iter()
            .map(|r| format!("{}/{}", r.nr, r.sp))
            .collect();
        out.push_str(&format!("References: {}\n", refs.join(", ")));
    }
    out
}

fn render_resource_line(resource: &ResourceLine) -> String {
    let mut line = format!(
        "  {:<18} {} {} {}",
        resource.code, resource.name, resource.quantity, resource.measure_unit
    );
    if let Some(cost) = resource.price.and_then(|p| p.cost) {
        line.push_str(&format!("  price {cost:.2}"));
    }
    if let Some(db) = &resource.catalog_database {
        line.push_str(&format!("  [{db}]"));
    }
    line.push('\n');
    line
}

pub fn render_resource(resource: &ResourceReference) -> String {
    let mut out = format!("{} {}\n", resource.code, resource.name);
    out.push_str(&format!("Unit: {}\n", resource.measure_unit));
    out.push_str(&format!("Database: {}\n", resource.database));
    if !resource.section_names.is_empty() {
        out.push_str(&format!(
            "Path: {}\n",
            resource.section_names.join(PATH_SEPARATOR)
        ));
    }
    if let Some(price) = resource.price {
        let fmt = |v: Option<f64>| v.map_or("n/a".to_string(), |v| format!("{v:.2}"));
        out.push_str(&format!(
            "Price: {} (wholesale {})\n",
            fmt(price.cost),
            fmt(price.opt_cost)
        ));
    }
    out
}

pub fn render_suggestions(state: &SuggestionState) -> String {
    let mut out = String::new();
    for group in &state.groups {
        out.push_str(&format!("[{}]\n", group.category));
        for item in &group.items {
            out.push_str(&format!("  {:<18} {}  {:.2}", item.code, item.name, item.score));
            if !item.path_names.is_empty() {
                out.push_str(&format!("  ({})", item.path_names.join(PATH_SEPARATOR)));
            }
            out.push('\n');
        }
    }
    if out.is_empty() && state.error.is_none() {
        out.push_str("No suggestions\n");
    }
    out
}

pub fn render_search(state: &SearchState) -> String {
    let mut out = String::new();
    for group in &state.groups {
        out.push_str(&format!("{} ({}): {}\n", group.database, group.name, group.hits.len()));
        for hit in &group.hits {
            out.push_str(&format!("  {:<18} {}", hit.code, hit.name));
            if !hit.section_names.is_empty() {
                out.push_str(&format!("  ({})", hit.section_names.join(PATH_SEPARATOR)));
            }
            out.push('\n');
        }
    }
    if out.is_empty() && state.error.is_none() {
        out.push_str(&format!("Nothing found for `{}`\n", state.query));
    }
    out
}

use crate::domain::user::User;
use serde::Serialize;
use std::collections::{HashMap, HashSet};

/// A user placed in the reporting tree.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct HierarchyNode {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub department: String,
    pub direct_reports: usize,
    pub children: Vec<HierarchyNode>,
}

impl HierarchyNode {
    /// Number of nodes in this subtree, the node itself included.
    pub fn size(&self) -> usize {
        1 + self.children.iter().map(HierarchyNode::size).sum::<usize>()
    }
}

/// Case-insensitive match over name, email, department and role id.
pub fn matches_search(user: &User, search: &str) -> bool {
    let needle = search.trim().to_lowercase();
    if needle.is_empty() {
        return true;
    }
    [&user.name, &user.email, &user.department, &user.role]
        .iter()
        .any(|field| field.to_lowercase().contains(&needle))
}

/// Builds the reporting forest from the directory.
///
/// A user's parent is the first user whose name equals their `manager`.
/// Users without a resolvable manager become roots. Directory order is kept.
pub fn build_hierarchy(users: &[User], search: Option<&str>) -> Vec<HierarchyNode> {
    let members: Vec<&User> = users
        .iter()
        .filter(|u| search.is_none_or(|s| matches_search(u, s)))
        .collect();

    let mut first_by_name: HashMap<&str, usize> = HashMap::new();
    for (idx, user) in members.iter().enumerate() {
        first_by_name.entry(user.name.as_str()).or_insert(idx);
    }

    let mut children: Vec<Vec<usize>> = vec![Vec::new(); members.len()];
    let mut roots = Vec::new();
    for (idx, user) in members.iter().enumerate() {
        let parent = user
            .manager
            .as_deref()
            .and_then(|m| first_by_name.get(m).copied())
            .filter(|&p| p != idx);
        match parent {
            Some(p) => children[p].push(idx),
            None => roots.push(idx),
        }
    }

    let mut placed = HashSet::new();
    let mut forest: Vec<HierarchyNode> = roots
        .into_iter()
        .filter_map(|idx| build_node(idx, &members, &children, &mut placed))
        .collect();

    // Members caught in a manager cycle are reachable from no root.
    for idx in 0..members.len() {
        if !placed.contains(&idx) {
            if let Some(node) = build_node(idx, &members, &children, &mut placed) {
                forest.push(node);
            }
        }
    }
    forest
}

fn build_node(
    idx: usize,
    members: &[&User],
    children: &[Vec<usize>],
    placed: &mut HashSet<usize>,
) -> Option<HierarchyNode> {
    if !placed.insert(idx) {
        return None;
    }
    let user = members[idx];
    let nodes: Vec<HierarchyNode> = children[idx]
        .iter()
        .filter_map(|&child| build_node(child, members, children, placed))
        .collect();
    Some(HierarchyNode {
        user_id: user.id.clone(),
        name: user.name.clone(),
        email: user.email.clone(),
        role: user.role.clone(),
        department: user.department.clone(),
        direct_reports: nodes.len(),
        children: nodes,
    })
}

/// Returns true if `candidate_manager` reports (transitively) to `user_name`,
/// or is the user. Assigning such a manager would close a loop.
pub fn would_create_cycle(users: &[User], user_name: &str, candidate_manager: &str) -> bool {
    if user_name == candidate_manager {
        return true;
    }
    let mut seen = HashSet::new();
    let mut current = Some(candidate_manager.to_string());
    while let Some(name) = current {
        if name == user_name {
            return true;
        }
        if !seen.insert(name.clone()) {
            return false;
        }
        current = users
            .iter()
            .find(|u| u.name == name)
            .and_then(|u| u.manager.clone());
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(name: &str, manager: Option<&str>, department: &str) -> User {
        User::new(
            name.to_string(),
            format!("{}@resolv.ai", name.to_lowercase()),
            "junior_developer".to_string(),
            department.to_string(),
            manager.map(str::to_string),
            vec![],
        )
    }

    fn directory() -> Vec<User> {
        vec![
            user("Naveen", None, "Product Engineering"),
            user("Barani", Some("Naveen"), "Quality Assurance"),
            user("Bhubana", Some("Naveen"), "Frontend"),
            user("Ranjithkumar", None, "Infrastructure"),
            user("Amrin", Some("Ranjithkumar"), "Backend"),
            user("Ghost", Some("Nobody"), "Backend"),
        ]
    }

    #[test]
    fn test_build_hierarchy_links_reports() {
        let forest = build_hierarchy(&directory(), None);
        let names: Vec<&str> = forest.iter().map(|n| n.name.as_str()).collect();
        assert_eq!(names, vec!["Naveen", "Ranjithkumar", "Ghost"]);
        assert_eq!(forest[0].direct_reports, 2);
        assert_eq!(forest[0].children[0].name, "Barani");
        assert_eq!(forest.iter().map(HierarchyNode::size).sum::<usize>(), 6);
    }

    #[test]
    fn test_unresolved_manager_becomes_root() {
        let forest = build_hierarchy(&directory(), None);
        let ghost = forest.iter().find(|n| n.name == "Ghost").unwrap();
        assert!(ghost.children.is_empty());
    }

    #[test]
    fn test_search_filters_before_building() {
        let forest = build_hierarchy(&directory(), Some("backend"));
        assert_eq!(forest.len(), 2);
        // Amrin's manager is filtered out, so Amrin is a root.
        assert!(forest.iter().all(|n| n.department == "Backend"));
    }

    #[test]
    fn test_cycle_members_are_still_placed_once() {
        let users = vec![user("A", Some("B"), "X"), user("B", Some("A"), "X")];
        let forest = build_hierarchy(&users, None);
        assert_eq!(forest.iter().map(HierarchyNode::size).sum::<usize>(), 2);
    }

    #[test]
    fn test_would_create_cycle() {
        let users = directory();
        assert!(would_create_cycle(&users, "Naveen", "Naveen"));
        assert!(would_create_cycle(&users, "Naveen", "Barani"));
        assert!(!would_create_cycle(&users, "Barani", "Ranjithkumar"));
        assert!(!would_create_cycle(&users, "Amrin", "Nobody"));
    }

    #[test]
    fn test_matches_search_on_role() {
        let u = user("Dhina", None, "Engineering");
        assert!(matches_search(&u, "JUNIOR"));
        assert!(matches_search(&u, "  "));
        assert!(!matches_search(&u, "architect"));
    }
}

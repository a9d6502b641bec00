//! Topology validation.

use std::collections::HashSet;

use crate::error::{GraphError, GraphResult};
use crate::topology::{Header, Incidence, Link};

/// References exist, no self loops, no duplicate names.
pub(crate) fn validate_structure(headers: &[Header], links: &[Link]) -> GraphResult<()> {
    if headers.is_empty() {
        return Err(GraphError::Empty);
    }

    let mut names = HashSet::new();
    for h in headers {
        if !names.insert(h.name.as_str()) {
            return Err(GraphError::DuplicateName {
                what: "header",
                name: h.name.clone(),
            });
        }
    }

    let mut names = HashSet::new();
    for link in links {
        if !names.insert(link.name.as_str()) {
            return Err(GraphError::DuplicateName {
                what: "link",
                name: link.name.clone(),
            });
        }
        for header in [link.from, link.to] {
            if header.index() as usize >= headers.len() {
                return Err(GraphError::InvalidHeaderRef {
                    link: link.id,
                    header,
                });
            }
        }
        if link.from == link.to {
            return Err(GraphError::SelfLoop {
                link: link.id,
                header: link.from,
            });
        }
    }
    Ok(())
}

/// Every header has a link and is reachable from header 0.
pub(crate) fn validate_connected(
    headers: &[Header],
    links: &[Link],
    offsets: &[usize],
    incidences: &[Incidence],
) -> GraphResult<()> {
    for (i, h) in headers.iter().enumerate() {
        if offsets[i] == offsets[i + 1] {
            return Err(GraphError::IsolatedHeader {
                header: h.id,
                name: h.name.clone(),
            });
        }
    }

    let mut seen = vec![false; headers.len()];
    let mut stack = vec![0_usize];
    seen[0] = true;
    while let Some(i) = stack.pop() {
        for inc in &incidences[offsets[i]..offsets[i + 1]] {
            let link = &links[inc.link.index() as usize];
            for next in [link.from.index() as usize, link.to.index() as usize] {
                if !seen[next] {
                    seen[next] = true;
                    stack.push(next);
                }
            }
        }
    }

    if let Some(i) = seen.iter().position(|s| !s) {
        return Err(GraphError::Disconnected {
            header: headers[i].id,
            name: headers[i].name.clone(),
        });
    }
    Ok(())
}

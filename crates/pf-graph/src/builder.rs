//! Incremental topology builder.

use pf_core::{BranchId, HeaderId};

use crate::error::GraphResult;
use crate::topology::{Header, Incidence, Link, LinkEnd, Topology};
use crate::validate;

/// Collects headers and links, then validates and freezes them with `build()`.
#[derive(Debug, Default)]
pub struct TopologyBuilder {
    headers: Vec<Header>,
    links: Vec<Link>,
}

impl TopologyBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_header(&mut self, name: impl Into<String>) -> HeaderId {
        let id = HeaderId::from_index(self.headers.len() as u32);
        self.headers.push(Header {
            id,
            name: name.into(),
        });
        id
    }

    /// Add a link carrying positive flow from `from` to `to`.
    pub fn add_link(&mut self, name: impl Into<String>, from: HeaderId, to: HeaderId) -> BranchId {
        let id = BranchId::from_index(self.links.len() as u32);
        self.links.push(Link {
            id,
            name: name.into(),
            from,
            to,
        });
        id
    }

    pub fn build(self) -> GraphResult<Topology> {
        validate::validate_structure(&self.headers, &self.links)?;
        let (offsets, incidences) = Self::build_adjacency(&self.headers, &self.links);
        validate::validate_connected(&self.headers, &self.links, &offsets, &incidences)?;

        Ok(Topology {
            headers: self.headers,
            links: self.links,
            offsets,
            incidences,
        })
    }

    fn build_adjacency(headers: &[Header], links: &[Link]) -> (Vec<usize>, Vec<Incidence>) {
        let mut per_header: Vec<Vec<Incidence>> = vec![Vec::new(); headers.len()];
        for link in links {
            per_header[link.from.index() as usize].push(Incidence {
                link: link.id,
                end: LinkEnd::Inlet,
            });
            per_header[link.to.index() as usize].push(Incidence {
                link: link.id,
                end: LinkEnd::Outlet,
            });
        }

        let mut offsets = Vec::with_capacity(headers.len() + 1);
        let mut flat = Vec::with_capacity(links.len() * 2);
        offsets.push(0);
        for list in per_header {
            flat.extend(list);
            offsets.push(flat.len());
        }
        (offsets, flat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_assigns_sequential_ids() {
        let mut builder = TopologyBuilder::new();
        let h1 = builder.add_header("H1");
        let h2 = builder.add_header("H2");
        let l1 = builder.add_link("L1", h1, h2);

        assert_eq!(h1.index(), 0);
        assert_eq!(h2.index(), 1);
        assert_eq!(l1.index(), 0);
        assert_eq!(builder.links.len(), 1);
    }

    #[test]
    fn build_two_header_loop() {
        let mut builder = TopologyBuilder::new();
        let h1 = builder.add_header("H1");
        let h2 = builder.add_header("H2");
        builder.add_link("Pump", h2, h1);
        builder.add_link("Load", h1, h2);

        let topo = builder.build().unwrap();
        assert_eq!(topo.incident(h1).len(), 2);
        assert_eq!(topo.incident(h2).len(), 2);
    }
}

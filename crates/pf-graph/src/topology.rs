//! Core topology data structures.

use pf_core::{BranchId, HeaderId};

/// A shared-pressure junction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    pub id: HeaderId,
    pub name: String,
}

/// One branch between two headers. Positive flow runs `from -> to`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub id: BranchId,
    pub name: String,
    pub from: HeaderId,
    pub to: HeaderId,
}

/// Which end of a link touches a header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkEnd {
    /// The header is the link's `from`; positive flow leaves the header.
    Inlet,
    /// The header is the link's `to`; positive flow enters the header.
    Outlet,
}

impl LinkEnd {
    /// +1 if positive link flow enters the header, -1 if it leaves.
    pub fn inflow_sign(self) -> f64 {
        match self {
            LinkEnd::Inlet => -1.0,
            LinkEnd::Outlet => 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Incidence {
    pub link: BranchId,
    pub end: LinkEnd,
}

/// Validated, immutable topology.
///
/// Header `i`'s incident links live in
/// `incidences[offsets[i]..offsets[i + 1]]`, sorted by link id.
#[derive(Debug, Clone)]
pub struct Topology {
    pub(crate) headers: Vec<Header>,
    pub(crate) links: Vec<Link>,
    pub(crate) offsets: Vec<usize>,
    pub(crate) incidences: Vec<Incidence>,
}

impl Topology {
    pub fn headers(&self) -> &[Header] {
        &self.headers
    }

    pub fn links(&self) -> &[Link] {
        &self.links
    }

    pub fn header(&self, id: HeaderId) -> Option<&Header> {
        self.headers.get(id.index() as usize)
    }

    pub fn link(&self, id: BranchId) -> Option<&Link> {
        self.links.get(id.index() as usize)
    }

    pub fn header_by_name(&self, name: &str) -> Option<HeaderId> {
        self.headers.iter().find(|h| h.name == name).map(|h| h.id)
    }

    pub fn link_by_name(&self, name: &str) -> Option<BranchId> {
        self.links.iter().find(|l| l.name == name).map(|l| l.id)
    }

    /// Links touching `header`.
    pub fn incident(&self, header: HeaderId) -> &[Incidence] {
        let idx = header.index() as usize;
        if idx >= self.headers.len() {
            return &[];
        }
        &self.incidences[self.offsets[idx]..self.offsets[idx + 1]]
    }

    /// Links joining `a` and `b` in either direction, with `true` when the
    /// link runs `a -> b`.
    pub fn links_between(
        &self,
        a: HeaderId,
        b: HeaderId,
    ) -> impl Iterator<Item = (BranchId, bool)> + '_ {
        self.links.iter().filter_map(move |l| {
            if l.from == a && l.to == b {
                Some((l.id, true))
            } else if l.from == b && l.to == a {
                Some((l.id, false))
            } else {
                None
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use crate::TopologyBuilder;

    #[test]
    fn incidence_sorted_per_header() {
        let mut b = TopologyBuilder::new();
        let h0 = b.add_header("A");
        let h1 = b.add_header("B");
        let l0 = b.add_link("L0", h0, h1);
        let l1 = b.add_link("L1", h1, h0);
        let topo = b.build().unwrap();

        let inc = topo.incident(h0);
        assert_eq!(inc.len(), 2);
        assert_eq!(inc[0].link, l0);
        assert_eq!(inc[0].end.inflow_sign(), -1.0);
        assert_eq!(inc[1].link, l1);
        assert_eq!(inc[1].end.inflow_sign(), 1.0);

        let between: Vec<_> = topo.links_between(h0, h1).collect();
        assert_eq!(between, vec![(l0, true), (l1, false)]);
    }
}

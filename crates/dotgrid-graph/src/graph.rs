use dotgrid_core::Dot;

/// Directed adjacency discovered during linking.
///
/// `from` was found while searching outward from `to`; the link is recorded on
/// `to`'s incoming list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DotLink {
    pub from: usize,
    pub to: usize,
    pub horizontal: bool,
}

/// All dots detected in one image plus the links between them.
///
/// Dots are addressed by their insertion index. Duplicates are kept as-is.
#[derive(Clone, Debug, Default)]
pub struct DotGraph {
    dots: Vec<Dot>,
    links: Vec<DotLink>,
    incoming: Vec<Vec<usize>>, // per dot, indices into `links`
}

impl DotGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_dots(dots: impl IntoIterator<Item = Dot>) -> Self {
        let mut graph = Self::new();
        for dot in dots {
            graph.add(dot);
        }
        graph
    }

    /// Append a dot and return its index.
    pub fn add(&mut self, dot: Dot) -> usize {
        self.dots.push(dot);
        self.incoming.push(Vec::new());
        self.dots.len() - 1
    }

    /// Record a link from `from` to `to` on `to`'s incoming list.
    pub fn link(&mut self, from: usize, to: usize, horizontal: bool) {
        let id = self.links.len();
        self.links.push(DotLink {
            from,
            to,
            horizontal,
        });
        self.incoming[to].push(id);
    }

    #[inline]
    pub fn nodes(&self) -> &[Dot] {
        &self.dots
    }

    #[inline]
    pub fn nodes_mut(&mut self) -> &mut [Dot] {
        &mut self.dots
    }

    #[inline]
    pub fn node(&self, i: usize) -> &Dot {
        &self.dots[i]
    }

    #[inline]
    pub fn node_mut(&mut self, i: usize) -> &mut Dot {
        &mut self.dots[i]
    }

    #[inline]
    pub fn links(&self) -> &[DotLink] {
        &self.links
    }

    /// Links recorded on dot `i`.
    pub fn incoming(&self, i: usize) -> impl Iterator<Item = &DotLink> + '_ {
        self.incoming[i].iter().map(move |&id| &self.links[id])
    }

    pub fn len(&self) -> usize {
        self.dots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dots.is_empty()
    }

    /// Index of the first dot flagged as the centre marker.
    pub fn centre_index(&self) -> Option<usize> {
        self.dots.iter().position(|d| d.is_centre)
    }

    pub fn assigned_count(&self) -> usize {
        self.dots.iter().filter(|d| d.is_assigned()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn links_land_on_target_incoming_list() {
        let mut g = DotGraph::new();
        let a = g.add(Dot::new(0.0, 0.0, 2.0));
        let b = g.add(Dot::new(10.0, 0.0, 2.0));
        let c = g.add(Dot::new(0.0, 10.0, 2.0));
        g.link(b, a, true);
        g.link(c, a, false);

        let inc: Vec<_> = g.incoming(a).copied().collect();
        assert_eq!(inc.len(), 2);
        assert_eq!(inc[0].from, b);
        assert!(inc[0].horizontal);
        assert_eq!(inc[1].from, c);
        assert!(!inc[1].horizontal);
        assert_eq!(g.incoming(b).count(), 0);
        assert_eq!(g.links().len(), 2);
    }

    #[test]
    fn duplicates_are_kept() {
        let g = DotGraph::from_dots([Dot::new(1.0, 1.0, 1.0), Dot::new(1.0, 1.0, 1.0)]);
        assert_eq!(g.len(), 2);
        assert_eq!(g.centre_index(), None);
    }
}

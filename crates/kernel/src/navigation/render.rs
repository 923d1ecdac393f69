//! UI-agnostic rendering of navigation menus.
//!
//! The registry knows nothing about how menus look. The rendering layer
//! passes one function for links and one for sections and gets back whatever
//! those functions build.

use mosaic_sdk::types::{NavigationItem, NavigationLink, NavigationSection};

/// Where an item sits in the menu being rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RenderContext {
    /// Position among its siblings.
    pub index: usize,
    /// Nesting depth, 0 for top-level items.
    pub level: usize,
}

/// Fold a menu into the caller's output type.
///
/// Section children are rendered first and passed to `render_section`.
pub fn render_items<T, L, S>(
    items: &[NavigationItem],
    mut render_link: L,
    mut render_section: S,
) -> Vec<T>
where
    L: FnMut(&NavigationLink, RenderContext) -> T,
    S: FnMut(&NavigationSection, Vec<T>, RenderContext) -> T,
{
    render_level(items, 0, &mut render_link, &mut render_section)
}

fn render_level<T, L, S>(
    items: &[NavigationItem],
    level: usize,
    render_link: &mut L,
    render_section: &mut S,
) -> Vec<T>
where
    L: FnMut(&NavigationLink, RenderContext) -> T,
    S: FnMut(&NavigationSection, Vec<T>, RenderContext) -> T,
{
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let ctx = RenderContext { index, level };
            match item {
                NavigationItem::Link(link) => render_link(link, ctx),
                NavigationItem::Section(section) => {
                    let children =
                        render_level(&section.children, level + 1, render_link, render_section);
                    render_section(section, children, ctx)
                }
            }
        })
        .collect()
}

//! The static bird catalogue used as initial data by the birds page and
//! looked up by the bird fragment route.

use serde::Serialize;

pub const HERO_IMAGE: &str =
    "https://cdn.pixabay.com/photo/2018/05/01/17/30/adler-3366239_1280.jpg";

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
pub struct Bird {
    pub id: u32,
    pub name: &'static str,
    pub habitat: &'static str,
    pub summary: &'static str,
}

const BIRDS: &[Bird] = &[
    Bird {
        id: 1,
        name: "Golden Eagle",
        habitat: "Mountains and open country",
        summary: "A powerful raptor that hunts hares and marmots from high soaring flight.",
    },
    Bird {
        id: 2,
        name: "Common Kingfisher",
        habitat: "Slow rivers and lakes",
        summary: "Dives from a perch to catch small fish, flashing blue along the bank.",
    },
    Bird {
        id: 3,
        name: "Barn Owl",
        habitat: "Farmland and grassland",
        summary: "Hunts by sound alone in total darkness, gliding low over fields.",
    },
    Bird {
        id: 4,
        name: "Arctic Tern",
        habitat: "Coasts, from pole to pole",
        summary: "Makes the longest migration of any animal, following two summers a year.",
    },
];

pub fn all() -> &'static [Bird] {
    BIRDS
}

pub fn find(id: u32) -> Option<&'static Bird> {
    BIRDS.iter().find(|b| b.id == id)
}

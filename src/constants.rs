/// TMDB genre ids with the French labels shown in the catalog.
pub const GENRES: &[(i32, &str)] = &[
    (28, "Action"),
    (12, "Aventure"),
    (16, "Animation"),
    (35, "Comédie"),
    (80, "Crime"),
    (99, "Documentaire"),
    (18, "Drame"),
    (10751, "Famille"),
    (14, "Fantastique"),
    (36, "Histoire"),
    (27, "Horreur"),
    (10402, "Musique"),
    (9648, "Mystère"),
    (10749, "Romance"),
    (878, "Science-Fiction"),
    (10770, "Téléfilm"),
    (53, "Thriller"),
    (10752, "Guerre"),
    (37, "Western"),
];

pub mod limits {

    pub const TRENDING_DEFAULT: u64 = 20;

    pub const TRENDING_MAX: u64 = 50;

    pub const RECENT_DEFAULT: u64 = 20;

    pub const UPLOADS_DEFAULT: u64 = 50;
}

pub mod time_window {

    pub const DAY: &str = "day";

    pub const WEEK: &str = "week";
}

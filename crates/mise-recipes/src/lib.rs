pub mod book;
pub mod resolver;

pub use book::RecipeBook;
pub use resolver::{IngredientLookup, RecipeLookup, resolve_cost};

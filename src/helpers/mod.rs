pub mod tour_helpers;

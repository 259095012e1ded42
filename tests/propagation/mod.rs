mod events;
mod propagators;
mod stopcond;
mod trajectory;

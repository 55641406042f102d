mod helpers;
mod yql;
